//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging with typed fields, never secrets
//! - Upstream call accounting goes through `UpstreamObserver` so the
//!   client does not depend on a metrics backend

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::{init_metrics, CallStatus, MetricsObserver, NoopObserver, UpstreamObserver};
