//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGINT (Ctrl+C) or SIGTERM
//! - Translate either into the internal shutdown broadcast
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Config reload is driven by the file watcher, not SIGHUP

use crate::lifecycle::shutdown::Shutdown;

/// Resolve on the first SIGINT or SIGTERM.
pub async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!(signal = "SIGINT", "Shutdown signal received"),
        _ = terminate => tracing::info!(signal = "SIGTERM", "Shutdown signal received"),
    }
}

/// Wait for a signal, then tell every subscriber to stop.
pub async fn shutdown_on_signal(shutdown: &Shutdown) {
    wait_for_shutdown().await;
    shutdown.trigger();
}
