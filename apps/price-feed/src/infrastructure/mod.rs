//! Infrastructure layer.
//!
//! Adapters for the WebSocket stream, the REST price lookup, and the
//! ambient concerns (config, telemetry).

/// Coalescing TTL price cache and its HTTP fetcher.
pub mod cache;

/// Configuration from environment variables.
pub mod config;

/// WebSocket price stream client.
pub mod stream;

/// Tracing subscriber setup.
pub mod telemetry;
