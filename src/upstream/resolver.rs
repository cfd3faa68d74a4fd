//! Endpoint fallback for capabilities published under two action names.
//!
//! Only structural absence (HTTP 404, "invalid action") moves on to the
//! secondary action. Entitlement failures and everything else surface
//! from the primary attempt unchanged. At most one substitution per call.

use std::future::Future;

use crate::upstream::error::ProxyResult;
use crate::upstream::request::UpstreamRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointResolver {
    primary: String,
    secondary: String,
}

impl EndpointResolver {
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }

    pub fn secondary(&self) -> &str {
        &self.secondary
    }

    /// Run `call` against the primary action, then once against the
    /// secondary when the primary is structurally missing.
    pub async fn resolve<T, F, Fut>(&self, request: &UpstreamRequest, mut call: F) -> ProxyResult<T>
    where
        F: FnMut(UpstreamRequest) -> Fut,
        Fut: Future<Output = ProxyResult<T>>,
    {
        let primary = request.with_action(&self.primary);
        match call(primary).await {
            Ok(value) => Ok(value),
            Err(err) if err.is_fallback_eligible() => {
                tracing::info!(
                    chain_id = request.chain_id,
                    primary = %self.primary,
                    secondary = %self.secondary,
                    error = %err,
                    "Primary action unavailable, falling back"
                );
                call(request.with_action(&self.secondary)).await
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::error::{Endpoint, ProxyError, UpstreamFailure};
    use std::sync::Mutex;

    const CONTRACT: &str = "0x7a250d5630b4cf539739df2c5dacb4c659f2488d";

    fn request() -> UpstreamRequest {
        UpstreamRequest::top_holders(1, CONTRACT, 10, "topholders").unwrap()
    }

    fn upstream_err(req: &UpstreamRequest, failure: UpstreamFailure) -> ProxyError {
        ProxyError::Upstream {
            endpoint: req.endpoint.clone(),
            chain_id: req.chain_id,
            failure,
        }
    }

    async fn run(first: impl Fn(&UpstreamRequest) -> ProxyError) -> (ProxyResult<&'static str>, Vec<UpstreamRequest>) {
        let resolver = EndpointResolver::new("topholders", "tokenholderlist");
        let calls = Mutex::new(Vec::new());
        let result = resolver
            .resolve(&request(), |req| {
                let attempt = {
                    let mut calls = calls.lock().unwrap();
                    calls.push(req.clone());
                    calls.len()
                };
                let outcome = if attempt == 1 { Err(first(&req)) } else { Ok("secondary") };
                async move { outcome }
            })
            .await;
        (result, calls.into_inner().unwrap())
    }

    #[tokio::test]
    async fn test_falls_back_on_404() {
        let (result, calls) = run(|req| upstream_err(req, UpstreamFailure::Http { status: 404 })).await;
        assert_eq!(result.unwrap(), "secondary");
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].endpoint, Endpoint::new("token", "topholders"));
        assert_eq!(calls[1].endpoint, Endpoint::new("token", "tokenholderlist"));
        assert_eq!(calls[0].params, calls[1].params);
    }

    #[tokio::test]
    async fn test_falls_back_on_invalid_action() {
        let (result, calls) = run(|req| {
            upstream_err(
                req,
                UpstreamFailure::InvalidAction {
                    message: "Invalid action".into(),
                },
            )
        })
        .await;
        assert_eq!(result.unwrap(), "secondary");
        assert_eq!(calls.len(), 2);
    }

    #[tokio::test]
    async fn test_no_fallback_on_plan_restriction() {
        let (result, calls) = run(|req| ProxyError::FeatureUnavailable {
            endpoint: req.endpoint.clone(),
            chain_id: req.chain_id,
            reason: "API Pro endpoint".into(),
        })
        .await;
        assert!(matches!(result, Err(ProxyError::FeatureUnavailable { .. })));
        assert_eq!(calls.len(), 1);
    }

    #[tokio::test]
    async fn test_no_fallback_on_other_failures() {
        for failure in [
            UpstreamFailure::Http { status: 500 },
            UpstreamFailure::InvalidResult,
            UpstreamFailure::Network {
                detail: "timeout".into(),
            },
        ] {
            let (result, calls) = run(|req| upstream_err(req, failure.clone())).await;
            assert!(result.is_err());
            assert_eq!(calls.len(), 1);
        }
    }

    #[tokio::test]
    async fn test_secondary_failure_is_surfaced() {
        let resolver = EndpointResolver::new("topholders", "tokenholderlist");
        let result: ProxyResult<()> = resolver
            .resolve(&request(), |req| async move {
                Err(upstream_err(&req, UpstreamFailure::Http { status: 404 }))
            })
            .await;
        let err = result.unwrap_err();
        match err {
            ProxyError::Upstream { endpoint, .. } => assert_eq!(endpoint.action, "tokenholderlist"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
