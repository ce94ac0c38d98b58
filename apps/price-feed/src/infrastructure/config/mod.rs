//! Configuration loading.

mod settings;

pub use settings::{AppConfig, CacheSettings, ConfigError, StreamSettings};
