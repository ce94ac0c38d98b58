//! Application layer.
//!
//! Port definitions sitting between the domain and the infrastructure
//! adapters.

/// Port interfaces for the stream transport and price fetcher.
pub mod ports;
