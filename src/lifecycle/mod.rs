//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     config → logging → metrics → settings → cache → limiter
//!     → client → service → listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → server drains, background tasks exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Ordered shutdown: stop accept, drain, close

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
