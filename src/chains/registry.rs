//! Static table of chains the upstream serves.

use serde::Serialize;

/// Display metadata for one chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainMeta {
    /// Numeric chain id sent upstream as `chainid`.
    pub id: u64,
    /// Short lowercase key (e.g. "eth", "base").
    pub key: &'static str,
    /// Human readable network name.
    pub display_name: &'static str,
    /// Block explorer root, without trailing slash.
    pub explorer_base_url: &'static str,
    /// Whether the upstream plan used by this deployment can serve the chain.
    pub supported: bool,
}

const fn chain(
    id: u64,
    key: &'static str,
    display_name: &'static str,
    explorer_base_url: &'static str,
    supported: bool,
) -> ChainMeta {
    ChainMeta {
        id,
        key,
        display_name,
        explorer_base_url,
        supported,
    }
}

static CHAINS: &[ChainMeta] = &[
    chain(1, "eth", "Ethereum Mainnet", "https://etherscan.io", true),
    chain(10, "op", "OP Mainnet", "https://optimistic.etherscan.io", true),
    chain(56, "bsc", "BNB Smart Chain", "https://bscscan.com", true),
    chain(100, "gnosis", "Gnosis", "https://gnosisscan.io", true),
    chain(137, "polygon", "Polygon PoS", "https://polygonscan.com", true),
    chain(250, "ftm", "Fantom Opera", "https://ftmscan.com", false),
    chain(324, "zksync", "zkSync Era", "https://era.zksync.network", true),
    chain(1284, "glmr", "Moonbeam", "https://moonscan.io", true),
    chain(5000, "mantle", "Mantle", "https://mantlescan.xyz", true),
    chain(8453, "base", "Base", "https://basescan.org", true),
    chain(17000, "holesky", "Holesky Testnet", "https://holesky.etherscan.io", true),
    chain(42161, "arb", "Arbitrum One", "https://arbiscan.io", true),
    chain(42220, "celo", "Celo", "https://celoscan.io", true),
    chain(43114, "avax", "Avalanche C-Chain", "https://snowscan.xyz", true),
    chain(59144, "linea", "Linea", "https://lineascan.build", true),
    chain(81457, "blast", "Blast", "https://blastscan.io", true),
    chain(534352, "scroll", "Scroll", "https://scrollscan.com", true),
    chain(11155111, "sepolia", "Sepolia Testnet", "https://sepolia.etherscan.io", true),
];

/// Read-only view over the chain table.
///
/// Zero-sized; cheap to copy into every component that needs lookups.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainRegistry;

impl ChainRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Look up a chain by numeric id.
    pub fn get(&self, id: u64) -> Option<&'static ChainMeta> {
        CHAINS.iter().find(|c| c.id == id)
    }

    /// Look up a chain by short key, case-insensitively.
    pub fn by_key(&self, key: &str) -> Option<&'static ChainMeta> {
        CHAINS.iter().find(|c| c.key.eq_ignore_ascii_case(key))
    }

    /// True when the chain is known and the upstream can serve it.
    pub fn is_supported(&self, id: u64) -> bool {
        self.get(id).is_some_and(|c| c.supported)
    }

    /// All known chains in ascending id order.
    pub fn all(&self) -> &'static [ChainMeta] {
        CHAINS
    }

    /// Explorer link for a transaction on the given chain.
    pub fn tx_url(&self, id: u64, tx_hash: &str) -> Option<String> {
        self.get(id)
            .map(|c| format!("{}/tx/{}", c.explorer_base_url, tx_hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique() {
        let registry = ChainRegistry::new();
        let ids: HashSet<u64> = registry.all().iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), registry.all().len());
    }

    #[test]
    fn test_table_is_sorted() {
        let ids: Vec<u64> = ChainRegistry::new().all().iter().map(|c| c.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_lookup() {
        let registry = ChainRegistry::new();
        assert_eq!(registry.get(8453).unwrap().key, "base");
        assert_eq!(registry.by_key("ETH").unwrap().id, 1);
        assert!(registry.get(999_999).is_none());
        assert!(registry.is_supported(1));
        assert!(!registry.is_supported(250));
        assert!(!registry.is_supported(999_999));
    }

    #[test]
    fn test_tx_url() {
        let url = ChainRegistry::new().tx_url(1, "0xabc").unwrap();
        assert_eq!(url, "https://etherscan.io/tx/0xabc");
    }
}
