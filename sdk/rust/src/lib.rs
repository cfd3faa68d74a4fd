//! Typed client for the chain data proxy HTTP API.

pub mod client;

pub use client::{
    Availability, Holder, ProxyClient, SdkError, TokenInfo, Transaction, Transfer, TransferFilter,
    Unavailable,
};
