//! Price Update Payloads
//!
//! Wire-facing domain type carried by `price_update` and `price`
//! frames. Deserialization is tolerant of extra fields so the server
//! can enrich updates without breaking older clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single price observation for a trading pair.
///
/// # Wire Format (JSON)
/// ```json
/// {"price": 42500.12, "timestamp": 1700000000000}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceData {
    /// Last observed price, quote currency per base unit.
    pub price: f64,

    /// Server-side observation time (epoch milliseconds on the wire).
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_epoch_millis_timestamp() {
        let json = r#"{"price": 42500.12, "timestamp": 1700000000000}"#;
        let data: PriceData = serde_json::from_str(json).unwrap();

        assert_eq!(data.price, 42500.12);
        assert_eq!(data.timestamp.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn ignores_extra_fields() {
        let json = r#"{"price": 1.5, "timestamp": 0, "volume24h": 123.4}"#;
        let data: PriceData = serde_json::from_str(json).unwrap();

        assert_eq!(data.price, 1.5);
    }

    #[test]
    fn round_trips_through_json() {
        let data = PriceData {
            price: 0.000_042,
            timestamp: chrono::DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
        };

        let json = serde_json::to_string(&data).unwrap();
        assert!(json.contains("1700000000000"));

        let back: PriceData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, data);
    }
}
