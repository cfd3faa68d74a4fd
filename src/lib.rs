//! Multi-chain blockchain data proxy library.

// Core
pub mod cache;
pub mod chains;
pub mod service;
pub mod settings;
pub mod upstream;

// Surfaces
pub mod admin;
pub mod http;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
