//! Price Feed Binary
//!
//! Connects to the price stream, subscribes to the configured pairs,
//! and logs every update until shut down.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p price-feed
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `PRICE_FEED_API_URL`: HTTP(S) base URL of the trading API
//!
//! ## Optional
//! - `PRICE_FEED_IDENTITY`: identity token for the auth handshake
//! - `PRICE_FEED_PAIRS`: comma-separated pairs (default: BTC/USD,ETH/USD,SOL/USD)
//! - `PRICE_FEED_RECONNECT_DELAY_MS`: delay between reconnects (default: 3000)
//! - `PRICE_FEED_MAX_RECONNECT_ATTEMPTS`: reconnect budget (default: 5)
//! - `PRICE_FEED_CACHE_TTL_SECS`: price cache TTL (default: 60)
//! - `RUST_LOG`: log level (default: info)

use std::sync::Arc;

use anyhow::Context;
use price_feed::infrastructure::telemetry;
use price_feed::{
    AppConfig, HttpPriceFetcher, PriceCache, PriceCallback, PriceStreamClient, StreamClientConfig,
    WsTransport,
};
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    load_dotenv();
    telemetry::init();

    tracing::info!("starting price feed");

    let config = AppConfig::from_env().context("configuration")?;
    log_config(&config);

    // Seed one-shot prices through the cache before streaming starts.
    let fetcher = Arc::new(HttpPriceFetcher::new(&config.stream.endpoint));
    let cache = Arc::new(PriceCache::new(fetcher, config.cache.ttl));

    for pair in &config.stream.pairs {
        match cache.get(pair).await {
            Some(price) => tracing::info!(pair, price, "initial price"),
            None => tracing::warn!(pair, "no initial price available"),
        }
    }

    let stream_config =
        StreamClientConfig::new(&config.stream.endpoint, config.stream.identity.clone())
            .with_reconnect(config.stream.reconnect_config());
    let client = Arc::new(PriceStreamClient::new(
        stream_config,
        Arc::new(WsTransport::new()),
    ));

    client.connect().await.context("price stream connect")?;

    for pair in &config.stream.pairs {
        let pair_name = pair.clone();
        let callback: PriceCallback = Arc::new(move |data| {
            tracing::info!(pair = %pair_name, price = data.price, "price update");
        });
        client.on_price_update(pair, callback);
    }

    client.subscribe_to_pairs(&config.stream.pairs).await;

    tracing::info!("price feed ready");

    await_shutdown().await;

    client.close();
    tracing::info!("price feed stopped");
    Ok(())
}

/// Load .env from the current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &AppConfig) {
    tracing::info!(
        endpoint = %config.stream.endpoint,
        pairs = ?config.stream.pairs,
        reconnect_delay_ms = config.stream.reconnect_delay.as_millis(),
        max_reconnect_attempts = config.stream.max_reconnect_attempts,
        cache_ttl_secs = config.cache.ttl.as_secs(),
        "configuration loaded"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
async fn await_shutdown() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_err() {
            tracing::error!("failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_) => {
                tracing::error!("failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received Ctrl+C, shutting down");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, shutting down");
        }
    }
}
