//! Error taxonomy for upstream operations.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Identity of one upstream call, carried by errors for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub module: String,
    pub action: String,
}

impl Endpoint {
    pub fn new(module: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            action: action.into(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.module, self.action)
    }
}

/// Declared error kind, for callers that map errors to responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Upstream,
    FeatureUnavailable,
}

/// Why an upstream call was rejected or unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamFailure {
    /// Body is not a recognizable envelope.
    #[error("invalid response format")]
    InvalidFormat,

    /// Envelope was fine but `result` did not match the operation's schema.
    #[error("invalid result format")]
    InvalidResult,

    /// Explicit non-benign error status.
    #[error("{message}")]
    Status { message: String },

    /// Upstream does not know the action name on this deployment.
    #[error("{message}")]
    InvalidAction { message: String },

    /// Non-success HTTP status other than the entitlement codes.
    #[error("HTTP status {status}")]
    Http { status: u16 },

    /// Connection refused, timeout, DNS and friends.
    #[error("network error: {detail}")]
    Network { detail: String },

    /// The upstream answered but has no such object.
    #[error("transaction not found")]
    NotFound,
}

/// Errors surfaced by the upstream client and the data service.
#[derive(Debug, Clone, Error)]
pub enum ProxyError {
    /// Caller-supplied or constructed parameters are malformed.
    #[error("validation error: {0}")]
    Validation(String),

    /// Upstream was unreachable or returned an error or garbled response.
    #[error("upstream error on {endpoint} (chain {chain_id}): {failure}")]
    Upstream {
        endpoint: Endpoint,
        chain_id: u64,
        failure: UpstreamFailure,
    },

    /// The capability is not entitled on this plan or chain.
    #[error("feature unavailable on {endpoint} (chain {chain_id}): {reason}")]
    FeatureUnavailable {
        endpoint: Endpoint,
        chain_id: u64,
        reason: String,
    },
}

/// Result type for upstream operations.
pub type ProxyResult<T> = Result<T, ProxyError>;

impl ProxyError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Upstream { .. } => ErrorKind::Upstream,
            Self::FeatureUnavailable { .. } => ErrorKind::FeatureUnavailable,
        }
    }

    /// The upstream failure, if this is an upstream error.
    pub fn failure(&self) -> Option<&UpstreamFailure> {
        match self {
            Self::Upstream { failure, .. } => Some(failure),
            _ => None,
        }
    }

    /// Structural absence of an action (HTTP 404 or "invalid action").
    ///
    /// Entitlement failures are never eligible: a plan restriction applies
    /// to every action name for the same capability.
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(
            self.failure(),
            Some(UpstreamFailure::Http { status: 404 }) | Some(UpstreamFailure::InvalidAction { .. })
        )
    }

    /// Cacheable form of a feature-unavailable error.
    pub fn unavailable_notice(&self) -> Option<UnavailableNotice> {
        match self {
            Self::FeatureUnavailable {
                endpoint,
                chain_id,
                reason,
            } => Some(UnavailableNotice {
                endpoint: endpoint.clone(),
                chain_id: *chain_id,
                reason: reason.clone(),
            }),
            _ => None,
        }
    }
}

/// Serializable record of a feature-unavailable response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableNotice {
    pub endpoint: Endpoint,
    pub chain_id: u64,
    pub reason: String,
}

impl From<UnavailableNotice> for ProxyError {
    fn from(notice: UnavailableNotice) -> Self {
        ProxyError::FeatureUnavailable {
            endpoint: notice.endpoint,
            chain_id: notice.chain_id,
            reason: notice.reason,
        }
    }
}

/// Failure of a single call before endpoint and chain are attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallFailure {
    Upstream(UpstreamFailure),
    FeatureUnavailable(String),
}

impl CallFailure {
    pub fn into_error(self, endpoint: &Endpoint, chain_id: u64) -> ProxyError {
        match self {
            CallFailure::Upstream(failure) => ProxyError::Upstream {
                endpoint: endpoint.clone(),
                chain_id,
                failure,
            },
            CallFailure::FeatureUnavailable(reason) => ProxyError::FeatureUnavailable {
                endpoint: endpoint.clone(),
                chain_id,
                reason,
            },
        }
    }
}

impl From<UpstreamFailure> for CallFailure {
    fn from(failure: UpstreamFailure) -> Self {
        CallFailure::Upstream(failure)
    }
}
