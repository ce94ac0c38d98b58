//! Port Interfaces
//!
//! Contracts the infrastructure adapters implement, following the
//! hexagonal layering of the rest of the crate.
//!
//! ## Driven Ports (Outbound)
//!
//! - [`StreamTransport`]: opens a bidirectional text-frame connection
//!   to the price-publishing endpoint
//! - [`PriceFetcher`]: point-in-time REST price lookup behind the
//!   coalescing cache
//!
//! Both are object-safe so tests can substitute in-memory fakes for
//! the network adapters.

use async_trait::async_trait;

// =============================================================================
// Errors
// =============================================================================

/// Transport-level failures of the price stream connection.
///
/// These are never fatal to callers of the stream client; they surface
/// through logs and the reconnection protocol.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Establishing the connection failed before it opened.
    #[error("connect failed: {0}")]
    Connect(String),

    /// Sending an outbound frame failed.
    #[error("send failed: {0}")]
    Send(String),

    /// Receiving an inbound frame failed.
    #[error("receive failed: {0}")]
    Receive(String),
}

/// Failures of the REST price lookup.
///
/// The cache absorbs all of these into a cached `None`; they never
/// reach `PriceCache::get` callers.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// The request never produced a response.
    #[error("price request failed: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status.
    #[error("price endpoint returned status {0}")]
    Status(u16),

    /// The response body was not the expected shape.
    #[error("price response decode failed: {0}")]
    Decode(String),
}

// =============================================================================
// Stream Transport
// =============================================================================

/// Outbound half of a stream connection.
#[async_trait]
pub trait FrameSink: Send {
    /// Send one text frame.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Close the connection from the client side.
    async fn close(&mut self);
}

/// Inbound half of a stream connection.
#[async_trait]
pub trait FrameStream: Send {
    /// Receive the next text frame.
    ///
    /// `None` means the connection ended (close frame or EOF);
    /// `Some(Err(_))` is a transport fault on a still-open connection.
    async fn next_text(&mut self) -> Option<Result<String, TransportError>>;
}

/// Factory for stream connections.
///
/// One call to [`StreamTransport::connect`] yields the two halves of a
/// single logical connection.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Open a connection to `url` and split it into sink and stream.
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameStream>), TransportError>;
}

// =============================================================================
// Price Fetcher
// =============================================================================

/// Point-in-time price lookup for a single pair.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceFetcher: Send + Sync {
    /// Fetch the current price for `pair`.
    ///
    /// `Ok(None)` means the endpoint answered but knows no price for
    /// the pair.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport, status, or decode failure.
    async fn fetch_price(&self, pair: &str) -> Result<Option<f64>, FetchError>;
}
