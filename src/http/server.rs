//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, rate limiting)
//! - Mount the admin API when enabled
//! - Bind server to listener and serve until shutdown

use axum::{middleware, routing::get, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin;
use crate::config::ProxyConfig;
use crate::http::handlers;
use crate::security::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::service::DataService;
use crate::settings::SettingsProvider;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DataService>,
    pub limiter: Arc<RateLimiter>,
    pub settings: Arc<dyn SettingsProvider>,
    pub config: Arc<ProxyConfig>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        service: Arc<DataService>,
        limiter: Arc<RateLimiter>,
        settings: Arc<dyn SettingsProvider>,
        config: Arc<ProxyConfig>,
    ) -> Self {
        Self {
            service,
            limiter,
            settings,
            config,
            started_at: Instant::now(),
        }
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/chains", get(handlers::chains))
        .route("/api/{chain_id}/transfers", get(handlers::transfers))
        .route("/api/{chain_id}/tokens/{contract}", get(handlers::token_info))
        .route("/api/{chain_id}/tokens/{contract}/holders", get(handlers::holders))
        .route("/api/{chain_id}/tx/{hash}", get(handlers::transaction))
        .route_layer(middleware::from_fn_with_state(
            state.limiter.clone(),
            rate_limit_middleware,
        ));

    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .merge(api);

    if state.config.admin.enabled {
        app = app.nest("/admin", admin::router(state.clone()));
    }

    let timeout = Duration::from_secs(state.config.listener.request_timeout_secs);
    app.with_state(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TimeoutLayer::new(timeout)),
    )
}

/// HTTP server for the data proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        Self {
            router: build_router(state),
        }
    }

    /// Run the server until `shutdown` resolves, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
