//! Route-facing data service.
//!
//! # Data Flow
//! ```text
//! route handler
//!     → chain check (always, even on a warm cache)
//!     → cache lookup by derived key
//!     → hit: return (or re-raise a cached "unavailable" notice)
//!     → miss: UpstreamClient → write back with the operation's TTL
//! ```
//!
//! # Design Decisions
//! - Upstream and validation errors are never cached
//! - A feature-unavailable answer is cached only when
//!   `cache.cache_feature_unavailable` is set
//! - Pending transactions use a short TTL so confirmation shows up quickly

pub mod keys;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;

use crate::cache::{DualCache, ExternalStore, RedisStore};
use crate::config::schema::CacheConfig;
use crate::upstream::error::{ProxyResult, UnavailableNotice};
use crate::upstream::request::DEFAULT_HOLDER_LIMIT;
use crate::upstream::transport::{HttpTransport, UpstreamTransport};
use crate::upstream::types::{
    NormalizedHolder, NormalizedTokenInfo, NormalizedTransaction, NormalizedTransfer,
    TransferQuery, TxStatus,
};
use crate::upstream::UpstreamClient;

/// What a cache entry holds.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
enum Cached<R> {
    Value(R),
    Unavailable(UnavailableNotice),
}

pub struct DataService<T: UpstreamTransport = HttpTransport, E: ExternalStore = RedisStore> {
    client: Arc<UpstreamClient<T>>,
    cache: Arc<DualCache<E>>,
    policy: CacheConfig,
}

impl<T: UpstreamTransport, E: ExternalStore> DataService<T, E> {
    pub fn new(client: Arc<UpstreamClient<T>>, cache: Arc<DualCache<E>>, policy: CacheConfig) -> Self {
        Self {
            client,
            cache,
            policy,
        }
    }

    pub fn client(&self) -> &UpstreamClient<T> {
        &self.client
    }

    pub fn cache(&self) -> &DualCache<E> {
        &self.cache
    }

    async fn read_through<R, F, Fut>(
        &self,
        chain_id: u64,
        key: String,
        ttl: impl Fn(&R) -> u64,
        fetch: F,
    ) -> ProxyResult<R>
    where
        R: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ProxyResult<R>>,
    {
        // A cached answer must not outlive the chain being disabled.
        self.client.check_chain(chain_id)?;

        match self.cache.get::<Cached<R>>(&key).await {
            Some(Cached::Value(value)) => return Ok(value),
            Some(Cached::Unavailable(notice)) => {
                tracing::debug!(key = %key, "Serving cached feature-unavailable notice");
                return Err(notice.into());
            }
            None => {}
        }

        match fetch().await {
            Ok(value) => {
                self.cache
                    .set(&key, &Cached::Value(&value), ttl(&value))
                    .await;
                Ok(value)
            }
            Err(err) => {
                if self.policy.cache_feature_unavailable {
                    if let Some(notice) = err.unavailable_notice() {
                        self.cache
                            .set(
                                &key,
                                &Cached::<()>::Unavailable(notice),
                                self.policy.feature_unavailable_ttl_secs,
                            )
                            .await;
                    }
                }
                Err(err)
            }
        }
    }

    pub async fn token_transfers(
        &self,
        chain_id: u64,
        query: &TransferQuery,
    ) -> ProxyResult<Vec<NormalizedTransfer>> {
        let ttl = self.policy.transfers_ttl_secs;
        self.read_through(chain_id, keys::transfers(chain_id, query), |_| ttl, || {
            self.client.get_token_transfers(chain_id, query)
        })
        .await
    }

    pub async fn top_holders(
        &self,
        chain_id: u64,
        contract_address: &str,
        limit: Option<u32>,
    ) -> ProxyResult<Vec<NormalizedHolder>> {
        let limit = limit.unwrap_or(DEFAULT_HOLDER_LIMIT);
        let ttl = self.policy.holders_ttl_secs;
        self.read_through(
            chain_id,
            keys::holders(chain_id, contract_address, limit),
            |_| ttl,
            || self.client.get_top_holders(chain_id, contract_address, Some(limit)),
        )
        .await
    }

    pub async fn transaction_details(
        &self,
        chain_id: u64,
        tx_hash: &str,
    ) -> ProxyResult<NormalizedTransaction> {
        let (settled, pending) = (
            self.policy.transaction_ttl_secs,
            self.policy.pending_transaction_ttl_secs,
        );
        self.read_through(
            chain_id,
            keys::transaction(chain_id, tx_hash),
            |tx: &NormalizedTransaction| {
                if tx.status == Some(TxStatus::Pending) {
                    pending
                } else {
                    settled
                }
            },
            || self.client.get_transaction_details(chain_id, tx_hash),
        )
        .await
    }

    pub async fn token_info(
        &self,
        chain_id: u64,
        contract_address: &str,
    ) -> ProxyResult<NormalizedTokenInfo> {
        let full = self.policy.token_info_ttl_secs;
        // Missing supply is retried on the unavailable-feature schedule.
        let partial = full.min(self.policy.feature_unavailable_ttl_secs);
        self.read_through(
            chain_id,
            keys::token_info(chain_id, contract_address),
            |info: &NormalizedTokenInfo| {
                if info.total_supply_raw.is_some() {
                    full
                } else {
                    partial
                }
            },
            || self.client.get_token_info(chain_id, contract_address),
        )
        .await
    }
}

impl<T: UpstreamTransport, E: ExternalStore> std::fmt::Debug for DataService<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataService")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::client::tests::{
        client, holders_payload, ok, rpc, ScriptedTransport, CONTRACT, HOLDER, TX,
    };
    use crate::upstream::error::ErrorKind;
    use serde_json::json;

    fn service(transport: ScriptedTransport, policy: CacheConfig) -> DataService<ScriptedTransport> {
        DataService::new(
            Arc::new(client(transport)),
            Arc::new(DualCache::<RedisStore>::local_only()),
            policy,
        )
    }

    fn calls(service: &DataService<ScriptedTransport>) -> usize {
        service.client().transport().call_count()
    }

    fn transfer_payload() -> serde_json::Value {
        ok(json!([{
            "hash": TX,
            "blockNumber": "100",
            "timeStamp": "1700000000",
            "from": HOLDER,
            "to": CONTRACT,
            "contractAddress": CONTRACT,
            "value": "1000",
            "tokenSymbol": "",
            "tokenName": "",
            "tokenDecimal": ""
        }]))
    }

    #[tokio::test]
    async fn test_cache_hit_skips_upstream() {
        let service = service(
            ScriptedTransport::new().respond("tokentx", 200, transfer_payload()),
            CacheConfig::default(),
        );
        let query = TransferQuery {
            address: Some(CONTRACT.to_string()),
            ..TransferQuery::default()
        };

        let first = service.token_transfers(1, &query).await.unwrap();
        let upper = TransferQuery {
            address: Some(format!("0x{}", CONTRACT[2..].to_uppercase())),
            ..query.clone()
        };
        let second = service.token_transfers(1, &upper).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls(&service), 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let service = service(
            ScriptedTransport::new()
                .respond("topholders", 200, json!({"status": "0", "message": "NOTOK", "result": "Max rate limit reached"}))
                .respond("topholders", 200, holders_payload()),
            CacheConfig::default(),
        );

        let err = service.top_holders(1, CONTRACT, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Upstream);

        let holders = service.top_holders(1, CONTRACT, None).await.unwrap();
        assert_eq!(holders.len(), 2);
        assert_eq!(calls(&service), 2);
    }

    #[tokio::test]
    async fn test_feature_unavailable_not_cached_by_default() {
        let service = service(
            ScriptedTransport::new().respond("topholders", 403, json!({})),
            CacheConfig::default(),
        );

        for _ in 0..2 {
            let err = service.top_holders(1, CONTRACT, Some(10)).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::FeatureUnavailable);
        }
        assert_eq!(calls(&service), 2);
    }

    #[tokio::test]
    async fn test_feature_unavailable_cached_when_enabled() {
        let service = service(
            ScriptedTransport::new().respond("topholders", 403, json!({})),
            CacheConfig {
                cache_feature_unavailable: true,
                ..CacheConfig::default()
            },
        );

        let first = service.top_holders(1, CONTRACT, Some(10)).await.unwrap_err();
        let second = service.top_holders(1, CONTRACT, Some(10)).await.unwrap_err();
        assert_eq!(first.to_string(), second.to_string());
        assert_eq!(second.kind(), ErrorKind::FeatureUnavailable);
        assert_eq!(calls(&service), 1);
    }

    #[tokio::test]
    async fn test_disabled_chain_rejected_even_when_cached() {
        let service = service(ScriptedTransport::new(), CacheConfig::default());
        let key = keys::token_info(10, CONTRACT);
        let cached = NormalizedTokenInfo {
            contract_address: CONTRACT.to_string(),
            total_supply_raw: Some("1".into()),
            name: None,
            symbol: None,
            decimals: None,
        };
        service.cache().set(&key, &Cached::Value(&cached), 60).await;

        let err = service.token_info(10, CONTRACT).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(calls(&service), 0);
    }

    #[tokio::test]
    async fn test_transaction_roundtrips_through_cache() {
        let tx = json!({
            "hash": TX,
            "blockNumber": null,
            "from": HOLDER,
            "to": CONTRACT,
            "value": "0x0",
            "input": "0x"
        });
        let service = service(
            ScriptedTransport::new()
                .respond("eth_getTransactionByHash", 200, rpc(tx))
                .respond("eth_getTransactionReceipt", 200, rpc(serde_json::Value::Null))
                .respond("getstatus", 200, ok(json!({"isError": "0", "errDescription": ""}))),
            CacheConfig::default(),
        );

        let first = service.transaction_details(1, TX).await.unwrap();
        assert_eq!(first.status, Some(TxStatus::Pending));
        let second = service.transaction_details(1, TX).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(calls(&service), 3);
    }
}
