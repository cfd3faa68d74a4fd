//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use chain_data_proxy::cache::DualCache;
use chain_data_proxy::config::ProxyConfig;
use chain_data_proxy::http::{AppState, HttpServer};
use chain_data_proxy::security::RateLimiter;
use chain_data_proxy::service::DataService;
use chain_data_proxy::settings::{ReloadableSettings, SettingsProvider, SettingsSnapshot};
use chain_data_proxy::upstream::{EndpointResolver, HttpTransport, UpstreamClient};

pub const CONTRACT: &str = "0x7a250d5630b4cf539739df2c5dacb4c659f2488d";
pub const HOLDER: &str = "0x1111111111111111111111111111111111111111";
pub const TX: &str = "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b";

/// Explorer-style upstream answering by the `action` query parameter.
///
/// Unscripted actions get a 500. Every request is recorded in arrival order.
#[derive(Clone, Default)]
pub struct MockUpstream {
    script: Arc<Mutex<HashMap<String, (u16, String)>>>,
    actions: Arc<Mutex<Vec<String>>>,
}

impl MockUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, action: &str, status: u16, body: serde_json::Value) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(action.to_string(), (status, body.to_string()));
        self
    }

    pub fn actions(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.actions.lock().unwrap().len()
    }

    /// Bind an ephemeral port and serve until the runtime stops.
    pub async fn start(&self) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mock = self.clone();

        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((mut socket, _)) => {
                        let mock = mock.clone();
                        tokio::spawn(async move {
                            let mut buf = vec![0u8; 8192];
                            let mut read = 0;
                            // GET requests carry no body; the head is enough.
                            while read < buf.len() {
                                match socket.read(&mut buf[read..]).await {
                                    Ok(0) | Err(_) => break,
                                    Ok(n) => {
                                        read += n;
                                        if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                                            break;
                                        }
                                    }
                                }
                            }
                            let head = String::from_utf8_lossy(&buf[..read]).to_string();
                            let action = action_of(&head).unwrap_or_default();
                            mock.actions.lock().unwrap().push(action.clone());

                            let (status, body) = mock
                                .script
                                .lock()
                                .unwrap()
                                .get(&action)
                                .cloned()
                                .unwrap_or((500, "unscripted".to_string()));

                            let response_str = format!(
                                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                                status_line(status),
                                body.len(),
                                body
                            );
                            let _ = socket.write_all(response_str.as_bytes()).await;
                            let _ = socket.shutdown().await;
                            tokio::time::sleep(Duration::from_millis(10)).await;
                        });
                    }
                    Err(_) => break,
                }
            }
        });

        addr
    }
}

fn action_of(head: &str) -> Option<String> {
    let target = head.lines().next()?.split_whitespace().nth(1)?;
    let query = target.split_once('?')?.1;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == "action")
        .map(|(_, v)| v.to_string())
}

fn status_line(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        402 => "402 Payment Required",
        403 => "403 Forbidden",
        404 => "404 Not Found",
        429 => "429 Too Many Requests",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "500 Internal Server Error",
    }
}

pub fn ok(result: serde_json::Value) -> serde_json::Value {
    serde_json::json!({"status": "1", "message": "OK", "result": result})
}

pub fn rpc(result: serde_json::Value) -> serde_json::Value {
    serde_json::json!({"jsonrpc": "2.0", "id": 1, "result": result})
}

pub fn holders_payload() -> serde_json::Value {
    ok(serde_json::json!([
        {"TokenHolderAddress": HOLDER, "TokenHolderQuantity": "5000"},
        {"TokenHolderAddress": CONTRACT, "TokenHolderQuantity": "10"}
    ]))
}

/// Config pointing at `upstream` with chain 1 enabled and metrics off.
pub fn config_for(upstream: SocketAddr) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.upstream.base_url = format!("http://{}/api", upstream);
    config.upstream.api_key = "TESTKEY".to_string();
    config.upstream.chains = vec![1];
    config.upstream.timeout_secs = 2;
    config.observability.metrics_enabled = false;
    config
}

/// Wire the proxy the way the binary does, with a local-only cache, and
/// serve it on an ephemeral port.
pub async fn start_proxy(config: ProxyConfig) -> SocketAddr {
    let settings: Arc<dyn SettingsProvider> = Arc::new(ReloadableSettings::new(
        SettingsSnapshot::from(&config.upstream),
    ));
    let transport = HttpTransport::new(
        &config.upstream.base_url,
        Duration::from_secs(config.upstream.timeout_secs),
    )
    .unwrap();
    let client = UpstreamClient::new(
        transport,
        settings.clone(),
        EndpointResolver::new(
            config.upstream.holders_primary_action.clone(),
            config.upstream.holders_fallback_action.clone(),
        ),
    );
    let cache: Arc<DualCache> = Arc::new(DualCache::local_only());
    let service = Arc::new(DataService::new(Arc::new(client), cache, config.cache.clone()));
    let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));

    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState::new(service, limiter, settings, Arc::new(config));

    tokio::spawn(async move {
        let _ = HttpServer::new(state)
            .run(listener, std::future::pending::<()>())
            .await;
    });

    addr
}
