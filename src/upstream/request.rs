//! Outbound request construction.
//!
//! Every call is a GET with `chainid`, `module`, `action` and `apikey`
//! plus operation parameters. Parameters built here are validated before
//! anything leaves the process.

use alloy::primitives::{Address, B256};
use std::str::FromStr;

use crate::upstream::error::{Endpoint, ProxyError, ProxyResult};
use crate::upstream::types::TransferQuery;

pub const MAX_PAGE_SIZE: u32 = 1000;
/// Upstream refuses windows reaching past this many records.
pub const MAX_RESULT_WINDOW: u64 = 10_000;
pub const MAX_HOLDER_LIMIT: u32 = 1000;
pub const DEFAULT_HOLDER_LIMIT: u32 = 50;

/// A fully parameterized upstream call, minus the credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub endpoint: Endpoint,
    pub chain_id: u64,
    pub params: Vec<(&'static str, String)>,
}

impl UpstreamRequest {
    fn new(chain_id: u64, module: &str, action: &str) -> Self {
        Self {
            endpoint: Endpoint::new(module, action),
            chain_id,
            params: Vec::new(),
        }
    }

    fn param(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.params.push((name, value.into()));
        self
    }

    /// Same parameters against a different action of the same module.
    pub fn with_action(&self, action: &str) -> Self {
        Self {
            endpoint: Endpoint::new(self.endpoint.module.clone(), action),
            chain_id: self.chain_id,
            params: self.params.clone(),
        }
    }

    /// Query string pairs, credential included.
    pub fn query(&self, credential: &str) -> Vec<(&'static str, String)> {
        let mut query = Vec::with_capacity(self.params.len() + 4);
        query.push(("chainid", self.chain_id.to_string()));
        query.push(("module", self.endpoint.module.clone()));
        query.push(("action", self.endpoint.action.clone()));
        query.extend(self.params.iter().cloned());
        query.push(("apikey", credential.to_string()));
        query
    }

    /// `module/action?k=v&...` for logs; never contains the credential.
    pub fn describe(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!("{}?{}", self.endpoint, params.join("&"))
    }

    pub fn token_transfers(chain_id: u64, query: &TransferQuery) -> ProxyResult<Self> {
        if query.page == 0 {
            return Err(ProxyError::validation("page must be >= 1"));
        }
        if query.page_size == 0 || query.page_size > MAX_PAGE_SIZE {
            return Err(ProxyError::validation(format!(
                "page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        if u64::from(query.page) * u64::from(query.page_size) > MAX_RESULT_WINDOW {
            return Err(ProxyError::validation(format!(
                "page * page_size must not exceed {}",
                MAX_RESULT_WINDOW
            )));
        }

        let mut req = Self::new(chain_id, "account", "tokentx");
        if let Some(address) = &query.address {
            req = req.param("address", parse_address(address)?);
        }
        if let Some(contract) = &query.contract_address {
            req = req.param("contractaddress", parse_address(contract)?);
        }
        Ok(req
            .param("page", query.page.to_string())
            .param("offset", query.page_size.to_string())
            .param("sort", query.sort.as_str()))
    }

    pub fn top_holders(
        chain_id: u64,
        contract_address: &str,
        limit: u32,
        action: &str,
    ) -> ProxyResult<Self> {
        if limit == 0 || limit > MAX_HOLDER_LIMIT {
            return Err(ProxyError::validation(format!(
                "limit must be between 1 and {}",
                MAX_HOLDER_LIMIT
            )));
        }
        Ok(Self::new(chain_id, "token", action)
            .param("contractaddress", parse_address(contract_address)?)
            .param("page", "1")
            .param("offset", limit.to_string()))
    }

    pub fn transaction_by_hash(chain_id: u64, tx_hash: &str) -> ProxyResult<Self> {
        Ok(Self::new(chain_id, "proxy", "eth_getTransactionByHash")
            .param("txhash", parse_tx_hash(tx_hash)?))
    }

    pub fn transaction_receipt(chain_id: u64, tx_hash: &str) -> ProxyResult<Self> {
        Ok(Self::new(chain_id, "proxy", "eth_getTransactionReceipt")
            .param("txhash", parse_tx_hash(tx_hash)?))
    }

    pub fn execution_status(chain_id: u64, tx_hash: &str) -> ProxyResult<Self> {
        Ok(Self::new(chain_id, "transaction", "getstatus").param("txhash", parse_tx_hash(tx_hash)?))
    }

    pub fn token_supply(chain_id: u64, contract_address: &str) -> ProxyResult<Self> {
        Ok(Self::new(chain_id, "stats", "tokensupply")
            .param("contractaddress", parse_address(contract_address)?))
    }
}

/// Validate a 20-byte hex address; returns the lowercase `0x` form.
pub fn parse_address(raw: &str) -> ProxyResult<String> {
    let raw = raw.trim();
    if !raw.starts_with("0x") && !raw.starts_with("0X") {
        return Err(ProxyError::validation(format!("address '{}' must be 0x-prefixed", raw)));
    }
    Address::from_str(raw)
        .map(|a| format!("{:#x}", a))
        .map_err(|_| ProxyError::validation(format!("invalid address '{}'", raw)))
}

/// Validate a 32-byte hex transaction hash; returns the lowercase `0x` form.
pub fn parse_tx_hash(raw: &str) -> ProxyResult<String> {
    let raw = raw.trim();
    if !raw.starts_with("0x") && !raw.starts_with("0X") {
        return Err(ProxyError::validation(format!("tx hash '{}' must be 0x-prefixed", raw)));
    }
    B256::from_str(raw)
        .map(|h| format!("{:#x}", h))
        .map_err(|_| ProxyError::validation(format!("invalid transaction hash '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::types::SortOrder;

    const ADDR: &str = "0x7A250D5630B4CF539739DF2C5DACB4C659F2488D";
    const TX: &str = "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b";

    #[test]
    fn test_transfer_params() {
        let query = TransferQuery {
            address: Some(ADDR.to_string()),
            page: 2,
            page_size: 50,
            sort: SortOrder::Asc,
            ..Default::default()
        };
        let req = UpstreamRequest::token_transfers(1, &query).unwrap();
        assert_eq!(req.endpoint, Endpoint::new("account", "tokentx"));

        let q = req.query("KEY");
        assert_eq!(q[0], ("chainid", "1".to_string()));
        assert_eq!(q[1], ("module", "account".to_string()));
        assert_eq!(q[2], ("action", "tokentx".to_string()));
        assert!(q.contains(&("address", ADDR.to_lowercase())));
        assert!(q.contains(&("page", "2".to_string())));
        assert!(q.contains(&("offset", "50".to_string())));
        assert!(q.contains(&("sort", "asc".to_string())));
        assert_eq!(q.last().unwrap(), &("apikey", "KEY".to_string()));
        assert!(!q.iter().any(|(k, _)| *k == "contractaddress"));
    }

    #[test]
    fn test_pagination_limits() {
        let mut query = TransferQuery {
            address: Some(ADDR.to_string()),
            ..Default::default()
        };
        query.page = 0;
        assert!(UpstreamRequest::token_transfers(1, &query).is_err());
        query.page = 1;
        query.page_size = MAX_PAGE_SIZE + 1;
        assert!(UpstreamRequest::token_transfers(1, &query).is_err());
        query.page = 11;
        query.page_size = 1000;
        assert!(UpstreamRequest::token_transfers(1, &query).is_err());
        query.page = 10;
        assert!(UpstreamRequest::token_transfers(1, &query).is_ok());
    }

    #[test]
    fn test_with_action_keeps_params() {
        let primary = UpstreamRequest::top_holders(1, ADDR, 10, "topholders").unwrap();
        let secondary = primary.with_action("tokenholderlist");
        assert_eq!(secondary.endpoint.action, "tokenholderlist");
        assert_eq!(secondary.endpoint.module, "token");
        assert_eq!(secondary.params, primary.params);
    }

    #[test]
    fn test_describe_hides_credential() {
        let req = UpstreamRequest::token_supply(1, ADDR).unwrap();
        let described = req.describe();
        assert!(described.starts_with("stats/tokensupply?contractaddress=0x7a25"));
        assert!(!described.contains("apikey"));
    }

    #[test]
    fn test_parse_inputs() {
        assert_eq!(parse_address(ADDR).unwrap(), ADDR.to_lowercase());
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("7a250d5630b4cf539739df2c5dacb4c659f2488d").is_err());
        assert!(parse_address("0xZZ250d5630b4cf539739df2c5dacb4c659f2488d").is_err());
        assert_eq!(parse_tx_hash(TX).unwrap(), TX);
        assert!(parse_tx_hash(ADDR).is_err());
        assert!(UpstreamRequest::top_holders(1, ADDR, 0, "topholders").is_err());
    }
}
