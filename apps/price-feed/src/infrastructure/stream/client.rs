//! Price Stream Client
//!
//! Maintains one logical connection to the price-publishing endpoint,
//! translates the connection lifecycle and inbound frames into the
//! callback registry, and recovers from transport drops with a
//! bounded, fixed-delay reconnection protocol.
//!
//! # Lifecycle
//!
//! ```text
//! Disconnected ──connect()──► Connecting ──open──► Connected
//!       ▲                         │                    │
//!       │◄───── transport error ──┘                    │
//!       │◄───────── unexpected close (≤5 retries) ─────┤
//!       └◄───────────────── close() ──────────────────-┘
//! ```
//!
//! Reconnects re-run the full `connect()` sequence including
//! re-authentication, but do not resubscribe: the callback registry is
//! client-local and survives, server-side subscription state does not.
//! Callers needing continuity resubscribe after a reconnect.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{FrameSink, FrameStream, StreamTransport};
use crate::domain::subscription::{CallbackRegistry, Pair, PriceCallback};
use crate::infrastructure::stream::codec::{CodecError, JsonCodec};
use crate::infrastructure::stream::messages::{ClientMessage, ServerMessage};
use crate::infrastructure::stream::reconnect::{ReconnectConfig, ReconnectPolicy};

/// Path suffix of the price stream on the API host.
pub const WS_PATH: &str = "/ws/prices";

/// Outbound channel depth between client methods and the writer task.
const OUTBOUND_BUFFER: usize = 64;

/// Normalize an HTTP(S) endpoint to the stream URL.
///
/// `https://api.example.com` becomes `wss://api.example.com/ws/prices`;
/// `ws(s)` schemes pass through with the path appended.
#[must_use]
pub fn normalize_ws_url(endpoint: &str) -> String {
    let trimmed = endpoint.trim_end_matches('/');

    let base = if let Some(rest) = trimmed.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if trimmed.starts_with("wss://") || trimmed.starts_with("ws://") {
        trimmed.to_string()
    } else {
        format!("wss://{trimmed}")
    };

    format!("{base}{WS_PATH}")
}

// =============================================================================
// Errors and State
// =============================================================================

/// Errors surfaced by [`PriceStreamClient::connect`].
///
/// These are the only errors the client ever raises; everything else
/// (transport drops, protocol noise) goes through logs and the
/// reconnection protocol.
#[derive(Debug, thiserror::Error)]
pub enum StreamClientError {
    /// A connection attempt is already in progress.
    #[error("connection attempt already in progress")]
    AlreadyConnecting,

    /// The transport reported an error before the connection opened.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
}

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No live transport.
    #[default]
    Disconnected,
    /// `connect()` in progress.
    Connecting,
    /// Transport open and usable.
    Connected,
    /// `close()` in progress.
    Closing,
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the price stream client.
#[derive(Debug, Clone)]
pub struct StreamClientConfig {
    /// Fully normalized stream URL.
    pub url: String,
    /// Optional caller identity, sent as an `auth` frame on open.
    pub identity: Option<String>,
    /// Reconnection behavior.
    pub reconnect: ReconnectConfig,
}

impl StreamClientConfig {
    /// Create a configuration from an HTTP(S) API endpoint.
    #[must_use]
    pub fn new(endpoint: &str, identity: Option<String>) -> Self {
        Self {
            url: normalize_ws_url(endpoint),
            identity,
            reconnect: ReconnectConfig::default(),
        }
    }

    /// Override the reconnection configuration.
    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }
}

// =============================================================================
// Client
// =============================================================================

/// Mutable client state behind one lock.
///
/// `epoch` identifies the connection generation; reader tasks from a
/// superseded connection compare it before touching state.
struct ClientInner {
    state: ConnectionState,
    outbound: Option<mpsc::Sender<String>>,
    policy: ReconnectPolicy,
    manually_closed: bool,
    epoch: u64,
    reconnect_token: CancellationToken,
}

/// WebSocket price stream client.
///
/// One instance owns at most one live transport. Instances are
/// independent; nothing is shared between them. All methods are
/// callable concurrently through an `Arc`.
pub struct PriceStreamClient {
    config: StreamClientConfig,
    transport: Arc<dyn StreamTransport>,
    codec: JsonCodec,
    registry: CallbackRegistry,
    inner: Mutex<ClientInner>,
}

impl PriceStreamClient {
    /// Create a new client. No network activity happens until
    /// [`connect`](Self::connect).
    #[must_use]
    pub fn new(config: StreamClientConfig, transport: Arc<dyn StreamTransport>) -> Self {
        let policy = ReconnectPolicy::new(config.reconnect.clone());
        Self {
            config,
            transport,
            codec: JsonCodec::new(),
            registry: CallbackRegistry::new(),
            inner: Mutex::new(ClientInner {
                state: ConnectionState::Disconnected,
                outbound: None,
                policy,
                manually_closed: false,
                epoch: 0,
                reconnect_token: CancellationToken::new(),
            }),
        }
    }

    /// Connect to the price stream.
    ///
    /// Resolves once the transport is open (and the `auth` frame is
    /// sent, when an identity was configured). Idempotent when already
    /// connected. On success the reconnect-attempt counter resets.
    ///
    /// # Errors
    ///
    /// [`StreamClientError::AlreadyConnecting`] if another attempt is
    /// in progress, [`StreamClientError::ConnectionFailed`] if the
    /// transport errors before opening or [`close`](Self::close)
    /// supersedes the attempt while it is in flight.
    pub async fn connect(self: &Arc<Self>) -> Result<(), StreamClientError> {
        let epoch = {
            let mut inner = self.inner.lock();
            match inner.state {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Connecting => return Err(StreamClientError::AlreadyConnecting),
                ConnectionState::Disconnected | ConnectionState::Closing => {}
            }
            inner.state = ConnectionState::Connecting;
            inner.manually_closed = false;
            inner.epoch += 1;
            inner.epoch
        };

        tracing::info!(url = %self.config.url, "connecting to price stream");

        let (mut sink, stream) = match self.transport.connect(&self.config.url).await {
            Ok(halves) => halves,
            Err(e) => {
                self.mark_disconnected(epoch);
                return Err(StreamClientError::ConnectionFailed(e.to_string()));
            }
        };

        // Authenticate before resolving so the server never sees
        // requests from an unauthenticated connection.
        if let Some(identity) = &self.config.identity {
            let frame = match self.codec.encode(&ClientMessage::Auth {
                identity: identity.clone(),
            }) {
                Ok(frame) => frame,
                Err(e) => {
                    self.mark_disconnected(epoch);
                    return Err(StreamClientError::ConnectionFailed(e.to_string()));
                }
            };

            if let Err(e) = sink.send_text(frame).await {
                self.mark_disconnected(epoch);
                return Err(StreamClientError::ConnectionFailed(format!(
                    "auth send failed: {e}"
                )));
            }
        }

        let (out_tx, out_rx) = mpsc::channel::<String>(OUTBOUND_BUFFER);

        // close() or a newer connect() may have raced us while the
        // transport was opening; commit only if this attempt is still
        // the current one.
        let committed = {
            let mut inner = self.inner.lock();
            if inner.manually_closed || inner.epoch != epoch {
                false
            } else {
                inner.state = ConnectionState::Connected;
                inner.outbound = Some(out_tx);
                inner.policy.reset();
                true
            }
        };

        if !committed {
            sink.close().await;
            tracing::info!("connection superseded before it opened; discarding");
            return Err(StreamClientError::ConnectionFailed(
                "closed before the connection was established".to_string(),
            ));
        }

        tokio::spawn(write_loop(sink, out_rx));

        let client = Arc::clone(self);
        tokio::spawn(async move {
            client.read_loop(stream, epoch).await;
        });

        tracing::info!("price stream connected");
        Ok(())
    }

    /// Send a subscribe frame for the listed pairs.
    ///
    /// Logged no-op when not connected. Does not touch the callback
    /// registry; subscribing and registering interest are orthogonal.
    pub async fn subscribe_to_pairs(&self, pairs: &[Pair]) {
        self.send_frame(
            &ClientMessage::Subscribe {
                pairs: pairs.to_vec(),
            },
            "subscribe",
        )
        .await;
    }

    /// Send an unsubscribe frame and drop **all** callbacks registered
    /// for the listed pairs.
    ///
    /// The registry clear is a hard reset and happens even when the
    /// frame cannot be sent; server and client subscription state are
    /// independent concerns.
    pub async fn unsubscribe_from_pairs(&self, pairs: &[Pair]) {
        self.send_frame(
            &ClientMessage::Unsubscribe {
                pairs: pairs.to_vec(),
            },
            "unsubscribe",
        )
        .await;

        self.registry.clear_pairs(pairs);
    }

    /// Request a one-shot price for a pair.
    ///
    /// The answer arrives through the registered callbacks, exactly
    /// like a streamed update. Logged no-op when not connected.
    pub async fn get_price(&self, pair: &str) {
        self.send_frame(
            &ClientMessage::GetPrice {
                pair: pair.to_string(),
            },
            "get_price",
        )
        .await;
    }

    /// Register a callback for update notifications on one pair.
    ///
    /// Set semantics: registering the identical handle twice has no
    /// additional effect.
    pub fn on_price_update(&self, pair: &str, callback: PriceCallback) {
        self.registry.register(pair, callback);
    }

    /// Deregister a callback.
    ///
    /// Removing the last callback for a pair drops the registry entry
    /// but sends no unsubscribe frame.
    pub fn off_price_update(&self, pair: &str, callback: &PriceCallback) {
        self.registry.deregister(pair, callback);
    }

    /// Close the connection and clear the whole callback registry.
    ///
    /// Suppresses the reconnection protocol, including any reconnect
    /// already scheduled. Idempotent.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.manually_closed = true;
        inner.state = ConnectionState::Closing;

        // Dropping the sender ends the writer task, which closes the
        // transport from our side.
        inner.outbound = None;

        inner.reconnect_token.cancel();
        inner.reconnect_token = CancellationToken::new();

        self.registry.clear();
        inner.state = ConnectionState::Disconnected;

        tracing::info!("price stream closed");
    }

    /// True only in the `Connected` state with a live transport.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        let inner = self.inner.lock();
        inner.state == ConnectionState::Connected && inner.outbound.is_some()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    /// The client-local callback registry.
    #[must_use]
    pub fn registry(&self) -> &CallbackRegistry {
        &self.registry
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Encode and send a frame, or log why it was dropped.
    async fn send_frame(&self, msg: &ClientMessage, what: &str) {
        let sender = {
            let inner = self.inner.lock();
            if inner.state == ConnectionState::Connected {
                inner.outbound.clone()
            } else {
                None
            }
        };

        let Some(sender) = sender else {
            tracing::warn!(request = what, "price stream not connected; dropping request");
            return;
        };

        match self.codec.encode(msg) {
            Ok(frame) => {
                if sender.send(frame).await.is_err() {
                    tracing::warn!(request = what, "price stream writer gone; dropping request");
                }
            }
            Err(e) => {
                tracing::error!(request = what, error = %e, "failed to encode outbound frame");
            }
        }
    }

    /// Drain inbound frames until the connection ends.
    async fn read_loop(self: Arc<Self>, mut stream: Box<dyn FrameStream>, epoch: u64) {
        while let Some(frame) = stream.next_text().await {
            match frame {
                Ok(text) => self.handle_frame(&text),
                Err(e) => {
                    tracing::warn!(error = %e, "price stream receive error");
                    break;
                }
            }
        }

        self.on_connection_lost(epoch);
    }

    /// Decode and act on one inbound frame. Never propagates errors.
    fn handle_frame(&self, text: &str) {
        match self.codec.decode(text) {
            Ok(ServerMessage::Connected) => {
                tracing::debug!("price stream acknowledged connection");
            }
            Ok(ServerMessage::Subscribed { pairs }) => {
                tracing::debug!(?pairs, "subscription confirmed");
            }
            Ok(ServerMessage::Unsubscribed { pairs }) => {
                tracing::debug!(?pairs, "unsubscription confirmed");
            }
            Ok(ServerMessage::PriceUpdate { pair, data } | ServerMessage::Price { pair, data }) => {
                let delivered = self.registry.dispatch(&pair, &data);
                tracing::trace!(pair, price = data.price, delivered, "price update dispatched");
            }
            Ok(ServerMessage::Error { message }) => {
                tracing::warn!(%message, "price stream reported an error");
            }
            Err(CodecError::UnknownMessageType(msg_type)) => {
                tracing::warn!(msg_type, "unrecognized price stream message");
            }
            Err(e) => {
                tracing::warn!(error = %e, "malformed price stream frame");
            }
        }
    }

    /// Reset to `Disconnected` if `epoch` is still the live connection.
    fn mark_disconnected(&self, epoch: u64) {
        let mut inner = self.inner.lock();
        if inner.epoch == epoch {
            inner.state = ConnectionState::Disconnected;
            inner.outbound = None;
        }
    }

    /// Handle the end of a connection's read loop.
    fn on_connection_lost(self: &Arc<Self>, epoch: u64) {
        {
            let mut inner = self.inner.lock();
            if inner.epoch != epoch {
                // A newer connection superseded this one.
                return;
            }

            inner.outbound = None;
            let suppress = inner.manually_closed || inner.state == ConnectionState::Closing;
            inner.state = ConnectionState::Disconnected;

            if suppress {
                return;
            }
        }

        tracing::warn!("price stream connection lost");
        self.schedule_reconnect();
    }

    /// Claim a reconnect attempt and spawn the delayed retry.
    fn schedule_reconnect(self: &Arc<Self>) {
        let (delay, attempt, token) = {
            let mut inner = self.inner.lock();
            if inner.manually_closed {
                return;
            }
            match inner.policy.next_delay() {
                Some(delay) => (delay, inner.policy.attempt_count(), inner.reconnect_token.clone()),
                None => {
                    tracing::warn!(
                        max_attempts = self.config.reconnect.max_attempts,
                        "reconnect attempts exhausted; price stream stays disconnected"
                    );
                    return;
                }
            }
        };

        tracing::info!(
            attempt,
            delay_ms = delay.as_millis(),
            "scheduling price stream reconnect"
        );

        let client = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    if client.inner.lock().manually_closed {
                        return;
                    }
                    match client.connect().await {
                        Ok(()) => tracing::info!(attempt, "price stream reconnected"),
                        Err(StreamClientError::AlreadyConnecting) => {
                            // A manual connect() raced us; let it win.
                        }
                        Err(e) => {
                            tracing::warn!(attempt, error = %e, "reconnect attempt failed");
                            client.schedule_reconnect();
                        }
                    }
                }
            }
        });
    }
}

impl std::fmt::Debug for PriceStreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceStreamClient")
            .field("url", &self.config.url)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Forward outbound frames to the transport until the channel closes,
/// then close the transport from our side.
async fn write_loop(mut sink: Box<dyn FrameSink>, mut out_rx: mpsc::Receiver<String>) {
    while let Some(frame) = out_rx.recv().await {
        if let Err(e) = sink.send_text(frame).await {
            tracing::warn!(error = %e, "price stream send error");
            break;
        }
    }
    sink.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_https_to_wss() {
        assert_eq!(
            normalize_ws_url("https://api.example.com"),
            "wss://api.example.com/ws/prices"
        );
    }

    #[test]
    fn normalizes_http_to_ws() {
        assert_eq!(
            normalize_ws_url("http://localhost:3000/"),
            "ws://localhost:3000/ws/prices"
        );
    }

    #[test]
    fn passes_ws_schemes_through() {
        assert_eq!(
            normalize_ws_url("wss://api.example.com"),
            "wss://api.example.com/ws/prices"
        );
    }

    #[test]
    fn bare_host_defaults_to_wss() {
        assert_eq!(
            normalize_ws_url("api.example.com"),
            "wss://api.example.com/ws/prices"
        );
    }

    #[test]
    fn config_normalizes_endpoint() {
        let config = StreamClientConfig::new("https://api.example.com/", None);
        assert_eq!(config.url, "wss://api.example.com/ws/prices");
        assert!(config.identity.is_none());
    }
}
