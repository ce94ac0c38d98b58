#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::default_trait_access
    )
)]

//! Price Feed - Real-time Price Subscription Layer
//!
//! Client-side core of a crypto trading front-end: a WebSocket price
//! stream client with bounded reconnection and a per-pair callback
//! registry, plus a TTL cache that coalesces concurrent REST price
//! lookups into a single in-flight request.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Pure types with no I/O
//!   - `streaming`: Price update payloads
//!   - `subscription`: Per-pair callback registry
//!
//! - **Application**: Port definitions
//!   - `ports`: Interfaces for the stream transport and price fetcher
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `stream`: WebSocket price stream client
//!   - `cache`: Coalescing TTL price cache
//!   - `config`: Configuration from environment
//!   - `telemetry`: Tracing subscriber setup
//!
//! # Data Flow
//!
//! ```text
//! Price WS ──► Stream Client ──► Callback Registry ──► UI callbacks
//! Price API ──► Price Fetcher ──► Price Cache ──► one-shot lookups
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Pure types with no external dependencies.
pub mod domain;

/// Application layer - Port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::streaming::PriceData;
pub use domain::subscription::{CallbackRegistry, Pair, PriceCallback};

// Ports
pub use application::ports::{
    FetchError, FrameSink, FrameStream, PriceFetcher, StreamTransport, TransportError,
};

// Stream client
pub use infrastructure::stream::client::{
    ConnectionState, PriceStreamClient, StreamClientConfig, StreamClientError,
};
pub use infrastructure::stream::codec::{CodecError, JsonCodec};
pub use infrastructure::stream::messages::{ClientMessage, ServerMessage};
pub use infrastructure::stream::reconnect::{ReconnectConfig, ReconnectPolicy};
pub use infrastructure::stream::transport::WsTransport;

// Price cache
pub use infrastructure::cache::{PriceCache, fetcher::HttpPriceFetcher};

// Configuration
pub use infrastructure::config::{AppConfig, CacheSettings, ConfigError, StreamSettings};
