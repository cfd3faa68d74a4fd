//! Chain registry subsystem.
//!
//! # Design Decisions
//! - Fixed table compiled into the binary; no mutable state
//! - Lookup by numeric id (what the upstream takes) or short key (what humans type)

pub mod registry;

pub use registry::{ChainMeta, ChainRegistry};
