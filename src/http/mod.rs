//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, timeout)
//!     → security::rate_limit (per-client admission on /api/*)
//!     → request.rs (query extraction)
//!     → handlers.rs → DataService
//!     → response.rs (error kind → status + JSON body)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::ApiError;
pub use server::{build_router, AppState, HttpServer};
