//! Domain layer.
//!
//! Pure types used by the stream client and price cache. Nothing in
//! here performs I/O.

/// Price update payloads.
pub mod streaming;

/// Per-pair callback registry.
pub mod subscription;
