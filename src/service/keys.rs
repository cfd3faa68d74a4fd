//! Cache key derivation.
//!
//! Keys are `"<op>:<chain>:<param>=<value>:..."`. Addresses and hashes are
//! lower-cased and trimmed, absent values render as `-`, and parameters
//! always appear in the same order, so equal requests share one entry.

use crate::upstream::types::TransferQuery;

const ABSENT: &str = "-";

fn norm(value: Option<&str>) -> String {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => v.to_ascii_lowercase(),
        None => ABSENT.to_string(),
    }
}

pub fn transfers(chain_id: u64, query: &TransferQuery) -> String {
    format!(
        "transfers:{}:address={}:contract={}:page={}:size={}:sort={}",
        chain_id,
        norm(query.address.as_deref()),
        norm(query.contract_address.as_deref()),
        query.page,
        query.page_size,
        query.sort,
    )
}

pub fn holders(chain_id: u64, contract_address: &str, limit: u32) -> String {
    format!(
        "holders:{}:contract={}:limit={}",
        chain_id,
        norm(Some(contract_address)),
        limit
    )
}

pub fn transaction(chain_id: u64, tx_hash: &str) -> String {
    format!("tx:{}:hash={}", chain_id, norm(Some(tx_hash)))
}

pub fn token_info(chain_id: u64, contract_address: &str) -> String {
    format!("token:{}:contract={}", chain_id, norm(Some(contract_address)))
}
