//! WebSocket Price Stream
//!
//! Everything that talks to the price-publishing WebSocket endpoint:
//! wire message types, the JSON codec, the reconnect policy, the
//! `tokio-tungstenite` transport adapter, and the stream client that
//! ties them together.

/// The price stream client.
pub mod client;

/// JSON frame codec.
pub mod codec;

/// Wire message types.
pub mod messages;

/// Fixed-delay bounded reconnect policy.
pub mod reconnect;

/// `tokio-tungstenite` transport adapter.
pub mod transport;
