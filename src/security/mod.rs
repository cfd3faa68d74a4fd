//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming /api/* request:
//!     → rate_limit.rs (per-client token bucket)
//!     → Pass to data handlers
//! ```
//!
//! # Design Decisions
//! - Admission is decided before any cache or upstream work
//! - Limiter faults (capacity) fail open or closed per configuration
//! - Client identity comes from the peer address unless forwarding headers are trusted

pub mod rate_limit;

pub use rate_limit::{RateLimitDecision, RateLimiter};
