use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub hash: String,
    pub block_number: u64,
    pub timestamp: u64,
    pub from: String,
    pub to: String,
    pub contract_address: String,
    pub value_raw: String,
    pub token_symbol: Option<String>,
    pub token_name: Option<String>,
    pub token_decimals: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holder {
    pub address: String,
    pub balance_raw: String,
    pub percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub hash: String,
    pub block_number: Option<u64>,
    pub from: String,
    pub to: Option<String>,
    pub value_wei: String,
    pub input: String,
    pub status: Option<String>,
    pub receipt: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub contract_address: String,
    pub total_supply_raw: Option<String>,
}

/// Soft answer for a capability the upstream plan does not include.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unavailable {
    pub available: bool,
    pub reason: String,
    pub endpoint: Option<String>,
    pub chain_id: Option<u64>,
}

/// Either the requested data or an "unavailable" notice.
#[derive(Debug, Clone, PartialEq)]
pub enum Availability<T> {
    Available(T),
    Unavailable(Unavailable),
}

#[derive(Debug)]
pub enum SdkError {
    Http(reqwest::Error),
    /// The proxy answered with a non-success status.
    Status { status: StatusCode, body: String },
    RateLimited { retry_after_secs: Option<u64> },
    Decode(serde_json::Error),
}

impl std::fmt::Display for SdkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SdkError::Http(e) => write!(f, "request failed: {}", e),
            SdkError::Status { status, body } => write!(f, "proxy returned {}: {}", status, body),
            SdkError::RateLimited { retry_after_secs } => {
                write!(f, "rate limited (retry after {:?}s)", retry_after_secs)
            }
            SdkError::Decode(e) => write!(f, "invalid response body: {}", e),
        }
    }
}

impl std::error::Error for SdkError {}

impl From<reqwest::Error> for SdkError {
    fn from(e: reqwest::Error) -> Self {
        SdkError::Http(e)
    }
}

/// Optional filters for a transfer listing.
#[derive(Debug, Clone, Default)]
pub struct TransferFilter {
    pub address: Option<String>,
    pub contract: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort: Option<String>,
}

pub struct ProxyClient {
    client: Client,
    proxy_url: String,
}

impl ProxyClient {
    pub fn new(proxy_url: &str) -> Self {
        Self {
            client: Client::new(),
            proxy_url: proxy_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Response, SdkError> {
        Ok(self
            .client
            .get(format!("{}{}", self.proxy_url, path))
            .query(query)
            .send()
            .await?)
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<Availability<T>, SdkError> {
        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(SdkError::RateLimited { retry_after_secs });
        }

        let text = resp.text().await?;
        if !status.is_success() {
            return Err(SdkError::Status { status, body: text });
        }

        let value: serde_json::Value = serde_json::from_str(&text).map_err(SdkError::Decode)?;
        if value.get("available") == Some(&serde_json::Value::Bool(false)) {
            let notice = serde_json::from_value(value).map_err(SdkError::Decode)?;
            return Ok(Availability::Unavailable(notice));
        }
        serde_json::from_value(value)
            .map(Availability::Available)
            .map_err(SdkError::Decode)
    }

    pub async fn health(&self) -> Result<serde_json::Value, SdkError> {
        let resp = self.get("/health", &[]).await?;
        resp.json().await.map_err(SdkError::Http)
    }

    /// Known chains with their support and configuration flags.
    pub async fn chains(&self) -> Result<Vec<serde_json::Value>, SdkError> {
        let resp = self.get("/api/chains", &[]).await?;
        match Self::decode(resp).await? {
            Availability::Available(chains) => Ok(chains),
            Availability::Unavailable(_) => Ok(Vec::new()),
        }
    }

    pub async fn token_transfers(
        &self,
        chain_id: u64,
        filter: &TransferFilter,
    ) -> Result<Availability<Vec<Transfer>>, SdkError> {
        let mut query = Vec::new();
        if let Some(v) = &filter.address {
            query.push(("address", v.clone()));
        }
        if let Some(v) = &filter.contract {
            query.push(("contract", v.clone()));
        }
        if let Some(v) = filter.page {
            query.push(("page", v.to_string()));
        }
        if let Some(v) = filter.page_size {
            query.push(("page_size", v.to_string()));
        }
        if let Some(v) = &filter.sort {
            query.push(("sort", v.clone()));
        }
        let resp = self.get(&format!("/api/{}/transfers", chain_id), &query).await?;
        Self::decode(resp).await
    }

    pub async fn top_holders(
        &self,
        chain_id: u64,
        contract: &str,
        limit: Option<u32>,
    ) -> Result<Availability<Vec<Holder>>, SdkError> {
        let query: Vec<(&str, String)> = limit.map(|l| ("limit", l.to_string())).into_iter().collect();
        let resp = self
            .get(&format!("/api/{}/tokens/{}/holders", chain_id, contract), &query)
            .await?;
        Self::decode(resp).await
    }

    pub async fn token_info(&self, chain_id: u64, contract: &str) -> Result<Availability<TokenInfo>, SdkError> {
        let resp = self.get(&format!("/api/{}/tokens/{}", chain_id, contract), &[]).await?;
        Self::decode(resp).await
    }

    pub async fn transaction(&self, chain_id: u64, hash: &str) -> Result<Availability<Transaction>, SdkError> {
        let resp = self.get(&format!("/api/{}/tx/{}", chain_id, hash), &[]).await?;
        Self::decode(resp).await
    }
}
