//! Per-client token-bucket rate limiting.
//!
//! # Responsibilities
//! - Admit or reject a request for a client identity before any upstream work
//! - Report remaining tokens, the limit, and retry-after for response headers
//! - Sweep idle buckets so spoofed or one-off identities do not grow memory
//!
//! # Design Decisions
//! - Refill is continuous: `max_tokens / window_secs` tokens per second of elapsed time
//! - Each bucket is updated under its map shard lock, so concurrent requests
//!   from one identity never lose an update
//! - The bucket map is capped; at capacity a new identity is admitted or
//!   rejected according to `fail_open`

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

use crate::config::schema::RateLimitConfig;
use crate::observability::metrics;

#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn full(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_refill: now,
        }
    }

    fn refill(&mut self, now: Instant, capacity: f64, rate: f64) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * rate).min(capacity);
        self.last_refill = now;
    }
}

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Whole tokens left after this check.
    pub remaining: u32,
    pub limit: u32,
    /// Seconds until a token is available; 0 when admitted.
    pub retry_after_secs: u64,
}

/// Current state of one identity's bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketSnapshot {
    pub identity: String,
    pub remaining: u32,
    pub limit: u32,
    pub idle_secs: u64,
}

/// Shared limiter. Construct once and hand out behind an `Arc`.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: Arc<DashMap<String, TokenBucket>>,
    config: RateLimitConfig,
    capacity: f64,
    refill_rate: f64,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let capacity = f64::from(config.max_tokens.max(1));
        let refill_rate = capacity / config.window_secs.max(1) as f64;
        Self {
            buckets: Arc::new(DashMap::new()),
            config,
            capacity,
            refill_rate,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Tokens added per second.
    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    /// Consume one token for `identity` if one is available.
    pub fn check(&self, identity: &str) -> RateLimitDecision {
        self.check_at(identity, Instant::now())
    }

    fn check_at(&self, identity: &str, now: Instant) -> RateLimitDecision {
        if let Some(mut bucket) = self.buckets.get_mut(identity) {
            return self.consume(&mut bucket, now);
        }

        if self.buckets.len() >= self.config.max_buckets {
            return self.saturated(identity);
        }

        let mut bucket = self
            .buckets
            .entry(identity.to_string())
            .or_insert_with(|| TokenBucket::full(self.capacity, now));
        self.consume(&mut bucket, now)
    }

    fn consume(&self, bucket: &mut TokenBucket, now: Instant) -> RateLimitDecision {
        bucket.refill(now, self.capacity, self.refill_rate);

        let allowed = bucket.tokens >= 1.0;
        if allowed {
            bucket.tokens -= 1.0;
        }

        RateLimitDecision {
            allowed,
            remaining: bucket.tokens.floor() as u32,
            limit: self.config.max_tokens,
            retry_after_secs: if allowed { 0 } else { self.secs_until_token(bucket.tokens) },
        }
    }

    fn secs_until_token(&self, tokens: f64) -> u64 {
        let wait = (1.0 - tokens).max(0.0) / self.refill_rate;
        (wait.ceil() as u64).max(1)
    }

    fn saturated(&self, identity: &str) -> RateLimitDecision {
        metrics::record_rate_limited("bucket_capacity");
        tracing::warn!(
            client = %identity,
            max_buckets = self.config.max_buckets,
            fail_open = self.config.fail_open,
            "Rate limiter at capacity"
        );
        RateLimitDecision {
            allowed: self.config.fail_open,
            remaining: 0,
            limit: self.config.max_tokens,
            retry_after_secs: if self.config.fail_open {
                0
            } else {
                self.secs_until_token(0.0)
            },
        }
    }

    /// Drop buckets idle for longer than the configured threshold.
    pub fn sweep_idle(&self) -> usize {
        self.sweep_idle_at(Instant::now())
    }

    fn sweep_idle_at(&self, now: Instant) -> usize {
        let threshold = Duration::from_secs(self.config.idle_threshold_secs);
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_refill) < threshold);
        let after = self.buckets.len();
        metrics::record_bucket_count(after);
        before.saturating_sub(after)
    }

    pub fn start_sweeper(self: &Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let limiter = Arc::clone(self);
        let interval = Duration::from_secs(self.config.sweep_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = limiter.sweep_idle();
                        if removed > 0 {
                            tracing::debug!(removed, "Swept idle rate-limit buckets");
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
        });
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Refilled view of `identity`'s bucket without consuming a token.
    pub fn bucket(&self, identity: &str) -> Option<BucketSnapshot> {
        let now = Instant::now();
        self.buckets.get(identity).map(|bucket| {
            let idle = now.saturating_duration_since(bucket.last_refill);
            let tokens =
                (bucket.tokens + idle.as_secs_f64() * self.refill_rate).min(self.capacity);
            BucketSnapshot {
                identity: identity.to_string(),
                remaining: tokens.floor() as u32,
                limit: self.config.max_tokens,
                idle_secs: idle.as_secs(),
            }
        })
    }
}

/// Identity used for bucketing: first `X-Forwarded-For` hop when trusted,
/// otherwise the peer IP.
pub fn client_identity(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn apply_headers(response: &mut Response, decision: &RateLimitDecision) {
    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    if !decision.allowed {
        headers.insert("retry-after", HeaderValue::from(decision.retry_after_secs));
    }
}

/// Middleware gating `/api/*` on the shared limiter.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !limiter.is_enabled() {
        return next.run(request).await;
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let identity = client_identity(request.headers(), peer, limiter.config().trust_forwarded_for);

    let decision = limiter.check(&identity);
    if !decision.allowed {
        tracing::warn!(client = %identity, retry_after = decision.retry_after_secs, "Rate limit exceeded");
        metrics::record_rate_limited("tokens_exhausted");
        let body = serde_json::json!({
            "error": "rate limit exceeded",
            "retryAfter": decision.retry_after_secs,
        });
        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        apply_headers(&mut response, &decision);
        return response;
    }

    let mut response = next.run(request).await;
    apply_headers(&mut response, &decision);
    response
}
