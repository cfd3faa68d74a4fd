//! Normalized DTOs returned to the route layer.
//!
//! Numeric values that may exceed 64 bits travel as decimal strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One token transfer. `hash` is not unique: a transaction can move
/// several tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTransfer {
    pub hash: String,
    pub block_number: u64,
    /// Unix seconds.
    pub timestamp: u64,
    pub from: String,
    pub to: String,
    pub contract_address: String,
    pub value_raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_decimals: Option<u32>,
}

/// One holder, in upstream rank order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedHolder {
    pub address: String,
    pub balance_raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
}

/// Execution outcome derived from block inclusion and execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Success,
    Fail,
    Pending,
}

impl TxStatus {
    /// Block inclusion wins over everything: an unmined transaction is
    /// pending whatever the execution-status call claims.
    pub fn derive(block_number: Option<u64>, execution_ok: bool) -> Self {
        match block_number {
            None => TxStatus::Pending,
            Some(_) if execution_ok => TxStatus::Success,
            Some(_) => TxStatus::Fail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedReceipt {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_gas_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<NormalizedLog>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTransaction {
    pub hash: String,
    pub block_number: Option<u64>,
    pub from: String,
    pub to: Option<String>,
    pub value_wei: String,
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TxStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<NormalizedReceipt>,
}

/// Token metadata. Only `total_supply_raw` is ever filled by the
/// endpoints in use; `None` there means the supply lookup failed or was
/// not offered, and the two cases are not distinguished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTokenInfo {
    pub contract_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_supply_raw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u32>,
}

/// Result ordering for paged lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("sort must be 'asc' or 'desc', got '{}'", other)),
        }
    }
}

/// Parameters of a token-transfer query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferQuery {
    pub address: Option<String>,
    pub contract_address: Option<String>,
    pub page: u32,
    pub page_size: u32,
    pub sort: SortOrder,
}

impl Default for TransferQuery {
    fn default() -> Self {
        Self {
            address: None,
            contract_address: None,
            page: 1,
            page_size: 25,
            sort: SortOrder::Desc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_derivation() {
        assert_eq!(TxStatus::derive(None, true), TxStatus::Pending);
        assert_eq!(TxStatus::derive(None, false), TxStatus::Pending);
        assert_eq!(TxStatus::derive(Some(10), true), TxStatus::Success);
        assert_eq!(TxStatus::derive(Some(10), false), TxStatus::Fail);
    }

    #[test]
    fn test_absent_optionals_are_omitted() {
        let transfer = NormalizedTransfer {
            hash: "0x1".into(),
            block_number: 1,
            timestamp: 2,
            from: "0xa".into(),
            to: "0xb".into(),
            contract_address: "0xc".into(),
            value_raw: "5".into(),
            token_symbol: None,
            token_name: None,
            token_decimals: None,
        };
        let json = serde_json::to_value(&transfer).unwrap();
        assert!(json.get("tokenSymbol").is_none());
        assert!(json.get("tokenDecimals").is_none());
        assert_eq!(json["valueRaw"], "5");
    }

    #[test]
    fn test_sort_order_parse() {
        assert_eq!("ASC".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert!("sideways".parse::<SortOrder>().is_err());
        assert_eq!(TransferQuery::default().sort, SortOrder::Desc);
    }
}
