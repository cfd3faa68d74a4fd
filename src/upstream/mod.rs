//! Upstream adapter subsystem.
//!
//! # Data Flow
//! ```text
//! client.rs (facade: chain + parameter checks)
//!     → request.rs (module/action/chain/params)
//!     → resolver.rs (holders only: primary → secondary on structural absence)
//!     → transport.rs (HTTP GET with deadline)
//!     → envelope.rs (status/message/result checks, failure classification)
//!     → normalize.rs (per-operation schema → DTO)
//! ```
//!
//! # Design Decisions
//! - No retries; the resolver's single substitution is the only second call
//! - Entitlement failures are a distinct error kind and never trigger fallback
//! - Schemas fail closed; numeric strings are never defaulted

pub mod client;
pub mod envelope;
pub mod error;
pub mod normalize;
pub mod request;
pub mod resolver;
pub mod transport;
pub mod types;

pub use client::UpstreamClient;
pub use error::{Endpoint, ErrorKind, ProxyError, ProxyResult, UnavailableNotice, UpstreamFailure};
pub use resolver::EndpointResolver;
pub use transport::{HttpTransport, RawResponse, TransportError, UpstreamTransport};
pub use types::{
    NormalizedHolder, NormalizedLog, NormalizedReceipt, NormalizedTokenInfo, NormalizedTransaction,
    NormalizedTransfer, SortOrder, TransferQuery, TxStatus,
};
