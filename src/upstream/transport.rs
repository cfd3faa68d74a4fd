//! HTTP transport to the upstream provider.
//!
//! The client talks to the provider through [`UpstreamTransport`] so tests
//! can script responses without a socket.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use url::Url;

/// Status and body of one upstream response, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid upstream URL '{0}'")]
    InvalidUrl(String),

    #[error("failed to build HTTP client: {0}")]
    Build(String),

    /// The request never produced a response.
    #[error("{0}")]
    Network(String),
}

/// Issues one GET against the upstream base URL with the given query.
pub trait UpstreamTransport: Send + Sync + 'static {
    fn get(
        &self,
        query: Vec<(&'static str, String)>,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;
}

/// `reqwest`-backed transport with a hard per-request deadline.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    timeout_duration: Duration,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout_duration: Duration) -> Result<Self, TransportError> {
        let base_url =
            Url::parse(base_url).map_err(|_| TransportError::InvalidUrl(base_url.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(timeout_duration)
            .connect_timeout(timeout_duration.min(Duration::from_secs(5)))
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            timeout_duration,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

fn describe(err: reqwest::Error) -> String {
    // The URL carries the credential.
    let err = err.without_url();
    if err.is_timeout() {
        format!("request timed out: {}", err)
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        err.to_string()
    }
}

impl UpstreamTransport for HttpTransport {
    async fn get(
        &self,
        query: Vec<(&'static str, String)>,
    ) -> Result<RawResponse, TransportError> {
        let request = async {
            let response = self
                .client
                .get(self.base_url.clone())
                .query(&query)
                .send()
                .await
                .map_err(|e| TransportError::Network(describe(e)))?;
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| TransportError::Network(describe(e)))?;
            Ok(RawResponse { status, body })
        };

        match timeout(self.timeout_duration, request).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Network(format!(
                "request timed out after {}s",
                self.timeout_duration.as_secs()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_base_url() {
        let err = HttpTransport::new("not a url", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, TransportError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Port 9 (discard) is closed on any sane test host.
        let transport = HttpTransport::new("http://127.0.0.1:9/api", Duration::from_secs(2)).unwrap();
        let err = transport
            .get(vec![("apikey", "secret".to_string())])
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Network(_)));
        assert!(!err.to_string().contains("secret"));
    }
}
