//! HTTP Price Fetcher
//!
//! `reqwest` adapter for the price fetcher port. One lookup is
//! `GET {base}/api/price?symbol=<PAIR>` answering
//! `{"price": number | null}`.

use async_trait::async_trait;
use serde::Deserialize;

use crate::application::ports::{FetchError, PriceFetcher};

/// Response body of the price endpoint.
#[derive(Debug, Deserialize)]
struct PriceResponse {
    #[serde(default)]
    price: Option<f64>,
}

/// Price fetcher backed by the REST price endpoint.
#[derive(Debug, Clone)]
pub struct HttpPriceFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPriceFetcher {
    /// Create a fetcher for an API base URL
    /// (e.g. `https://api.example.com`).
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Full URL of the price endpoint.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}/api/price", self.base_url)
    }
}

#[async_trait]
impl PriceFetcher for HttpPriceFetcher {
    async fn fetch_price(&self, pair: &str) -> Result<Option<f64>, FetchError> {
        let response = self
            .client
            .get(self.endpoint())
            .query(&[("symbol", pair)])
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body: PriceResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        Ok(body.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_strips_trailing_slash() {
        let fetcher = HttpPriceFetcher::new("https://api.example.com/");
        assert_eq!(fetcher.endpoint(), "https://api.example.com/api/price");
    }

    #[test]
    fn response_price_may_be_null() {
        let body: PriceResponse = serde_json::from_str(r#"{"price": null}"#).unwrap();
        assert_eq!(body.price, None);

        let body: PriceResponse = serde_json::from_str(r#"{"price": 42500.12}"#).unwrap();
        assert_eq!(body.price, Some(42500.12));

        let body: PriceResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(body.price, None);
    }
}
