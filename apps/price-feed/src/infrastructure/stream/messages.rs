//! Price Stream Wire Messages
//!
//! JSON text frames exchanged with the price-publishing endpoint.
//! Every frame carries a `type` discriminator.
//!
//! # Client → Server
//!
//! ```json
//! {"type": "auth", "identity": "..."}
//! {"type": "subscribe", "pairs": ["BTC/USD"]}
//! {"type": "unsubscribe", "pairs": ["BTC/USD"]}
//! {"type": "get_price", "pair": "BTC/USD"}
//! ```
//!
//! # Server → Client
//!
//! ```json
//! {"type": "connected"}
//! {"type": "subscribed", "pairs": ["BTC/USD"]}
//! {"type": "price_update", "pair": "BTC/USD", "data": {"price": 42500.12, "timestamp": 1700000000000}}
//! {"type": "error", "message": "..."}
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::streaming::PriceData;

/// Frames sent to the price stream server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Authenticate the connection immediately after it opens.
    Auth {
        /// Opaque caller identity token.
        identity: String,
    },

    /// Begin receiving updates for the listed pairs.
    Subscribe {
        /// Pairs to subscribe to.
        pairs: Vec<String>,
    },

    /// Stop receiving updates for the listed pairs.
    Unsubscribe {
        /// Pairs to unsubscribe from.
        pairs: Vec<String>,
    },

    /// Request a one-shot current price; the answer arrives as a
    /// `price` frame through the normal callback path.
    GetPrice {
        /// Pair to look up.
        pair: String,
    },
}

/// Frames received from the price stream server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection acknowledgment. Informational only.
    Connected,

    /// Subscription confirmation. Informational only.
    Subscribed {
        /// Pairs the server now streams to this connection.
        #[serde(default)]
        pairs: Vec<String>,
    },

    /// Unsubscription confirmation. Informational only.
    Unsubscribed {
        /// Pairs the server stopped streaming.
        #[serde(default)]
        pairs: Vec<String>,
    },

    /// Streamed price update for a subscribed pair.
    PriceUpdate {
        /// Pair the update is for.
        pair: String,
        /// The price observation.
        data: PriceData,
    },

    /// One-shot price answer to a `get_price` request. Delivered to
    /// callbacks exactly like a streamed update.
    Price {
        /// Pair the price is for.
        pair: String,
        /// The price observation.
        data: PriceData,
    },

    /// Server-side error. Informational only; the connection stays up.
    Error {
        /// Human-readable description.
        #[serde(default, alias = "msg")]
        message: String,
    },
}

impl ServerMessage {
    /// Message types this client recognizes.
    pub const KNOWN_TYPES: &'static [&'static str] = &[
        "connected",
        "subscribed",
        "unsubscribed",
        "price_update",
        "price",
        "error",
    ];
}
