//! Upstream client facade.
//!
//! # Responsibilities
//! - Validate chain and parameters before any call leaves the process
//! - Build, send and validate upstream calls
//! - Normalize results into DTOs
//! - Report every call to the observer
//!
//! Stateless apart from the injected collaborators; safe to share behind
//! an `Arc` across any number of concurrent requests.

use std::sync::Arc;

use crate::chains::ChainRegistry;
use crate::observability::metrics::{CallStatus, NoopObserver, UpstreamObserver};
use crate::settings::SettingsProvider;
use crate::upstream::envelope::{self, Payload};
use crate::upstream::error::{ProxyError, ProxyResult, UpstreamFailure};
use crate::upstream::normalize;
use crate::upstream::request::{parse_address, UpstreamRequest, DEFAULT_HOLDER_LIMIT};
use crate::upstream::resolver::EndpointResolver;
use crate::upstream::transport::{HttpTransport, UpstreamTransport};
use crate::upstream::types::{
    NormalizedHolder, NormalizedTokenInfo, NormalizedTransaction, NormalizedTransfer,
    TransferQuery, TxStatus,
};

pub struct UpstreamClient<T: UpstreamTransport = HttpTransport> {
    transport: T,
    settings: Arc<dyn SettingsProvider>,
    registry: ChainRegistry,
    holders: EndpointResolver,
    observer: Arc<dyn UpstreamObserver>,
}

impl<T: UpstreamTransport> UpstreamClient<T> {
    pub fn new(transport: T, settings: Arc<dyn SettingsProvider>, holders: EndpointResolver) -> Self {
        Self {
            transport,
            settings,
            registry: ChainRegistry::new(),
            holders,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Replace the call observer (metrics hook).
    pub fn with_observer(mut self, observer: Arc<dyn UpstreamObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    /// Reject chains that are unknown, unsupported, or not enabled here.
    pub fn check_chain(&self, chain_id: u64) -> ProxyResult<()> {
        match self.registry.get(chain_id) {
            None => Err(ProxyError::validation(format!("unknown chain id {}", chain_id))),
            Some(meta) if !meta.supported => Err(ProxyError::validation(format!(
                "chain {} ({}) is not supported by the upstream",
                chain_id, meta.display_name
            ))),
            Some(_) if !self.settings.is_chain_configured(chain_id) => Err(ProxyError::validation(
                format!("chain {} is not enabled on this deployment", chain_id),
            )),
            Some(_) => Ok(()),
        }
    }

    /// Send one request and validate its envelope.
    async fn call(&self, request: &UpstreamRequest) -> ProxyResult<Payload> {
        let credential = self.settings.api_credential();
        tracing::debug!(
            chain_id = request.chain_id,
            request = %request.describe(),
            "Calling upstream"
        );

        let raw = match self.transport.get(request.query(&credential)).await {
            Ok(raw) => raw,
            Err(e) => {
                self.observer
                    .on_upstream_call(&request.endpoint, request.chain_id, CallStatus::Network);
                tracing::warn!(
                    chain_id = request.chain_id,
                    endpoint = %request.endpoint,
                    error = %e,
                    "Upstream unreachable"
                );
                return Err(ProxyError::Upstream {
                    endpoint: request.endpoint.clone(),
                    chain_id: request.chain_id,
                    failure: UpstreamFailure::Network {
                        detail: e.to_string(),
                    },
                });
            }
        };

        self.observer
            .on_upstream_call(&request.endpoint, request.chain_id, CallStatus::Http(raw.status));

        envelope::open(raw.status, &raw.body).map_err(|failure| {
            let err = failure.into_error(&request.endpoint, request.chain_id);
            tracing::warn!(
                chain_id = request.chain_id,
                endpoint = %request.endpoint,
                http_status = raw.status,
                error = %err,
                "Upstream call failed"
            );
            err
        })
    }

    /// Send, validate, then normalize with the operation's schema.
    async fn fetch<R>(
        &self,
        request: &UpstreamRequest,
        normalize: fn(Payload) -> Result<R, UpstreamFailure>,
    ) -> ProxyResult<R> {
        let payload = self.call(request).await?;
        normalize(payload).map_err(|failure| {
            tracing::warn!(
                chain_id = request.chain_id,
                endpoint = %request.endpoint,
                error = %failure,
                "Upstream result rejected"
            );
            ProxyError::Upstream {
                endpoint: request.endpoint.clone(),
                chain_id: request.chain_id,
                failure,
            }
        })
    }

    /// Token transfers for an address and/or token contract.
    pub async fn get_token_transfers(
        &self,
        chain_id: u64,
        query: &TransferQuery,
    ) -> ProxyResult<Vec<NormalizedTransfer>> {
        self.check_chain(chain_id)?;
        let request = UpstreamRequest::token_transfers(chain_id, query)?;
        self.fetch(&request, normalize::transfers).await
    }

    /// Largest holders of a token, in upstream rank order.
    pub async fn get_top_holders(
        &self,
        chain_id: u64,
        contract_address: &str,
        limit: Option<u32>,
    ) -> ProxyResult<Vec<NormalizedHolder>> {
        self.check_chain(chain_id)?;
        let request = UpstreamRequest::top_holders(
            chain_id,
            contract_address,
            limit.unwrap_or(DEFAULT_HOLDER_LIMIT),
            self.holders.primary(),
        )?;
        self.holders
            .resolve(&request, |req| async move {
                self.fetch(&req, normalize::holders).await
            })
            .await
    }

    /// Transaction, receipt and execution status, fetched concurrently.
    ///
    /// All three calls must succeed; there is no partial result.
    pub async fn get_transaction_details(
        &self,
        chain_id: u64,
        tx_hash: &str,
    ) -> ProxyResult<NormalizedTransaction> {
        self.check_chain(chain_id)?;
        let tx_req = UpstreamRequest::transaction_by_hash(chain_id, tx_hash)?;
        let receipt_req = UpstreamRequest::transaction_receipt(chain_id, tx_hash)?;
        let status_req = UpstreamRequest::execution_status(chain_id, tx_hash)?;

        let (mut tx, receipt, execution_ok) = tokio::try_join!(
            self.fetch(&tx_req, normalize::transaction),
            self.fetch(&receipt_req, normalize::receipt),
            self.fetch(&status_req, normalize::execution_ok),
        )?;

        tx.status = Some(TxStatus::derive(tx.block_number, execution_ok));
        tx.receipt = receipt;
        Ok(tx)
    }

    /// Token metadata. A failed supply lookup leaves `total_supply_raw`
    /// empty instead of failing the whole call.
    pub async fn get_token_info(
        &self,
        chain_id: u64,
        contract_address: &str,
    ) -> ProxyResult<NormalizedTokenInfo> {
        self.check_chain(chain_id)?;
        let contract_address = parse_address(contract_address)?;
        let request = UpstreamRequest::token_supply(chain_id, &contract_address)?;

        let total_supply_raw = match self.fetch(&request, normalize::token_supply).await {
            Ok(supply) => Some(supply),
            Err(e) => {
                tracing::info!(
                    chain_id,
                    contract = %contract_address,
                    error = %e,
                    "Token supply unavailable, returning info without it"
                );
                None
            }
        };

        Ok(NormalizedTokenInfo {
            contract_address,
            total_supply_raw,
            name: None,
            symbol: None,
            decimals: None,
        })
    }
}
