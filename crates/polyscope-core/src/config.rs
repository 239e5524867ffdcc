//! Static configuration for the data layer.
//!
//! Plain values only; reading environment variables or files is the
//! caller's concern.

use std::time::Duration;

/// Connection and policy settings shared by all sources.
#[derive(Debug, Clone)]
pub struct Config {
    /// Trading-data source base URL.
    pub clob_base_url: String,
    /// Metadata source base URL.
    pub gamma_base_url: String,
    /// Portfolio/activity source base URL.
    pub data_base_url: String,
    /// Optional bearer token for the trading-data source.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Maximum retries per call; total attempts = `max_retries + 1`.
    pub max_retries: u32,
    /// Base delay of the exponential backoff.
    pub retry_base_delay: Duration,
    /// Shared request budget: `requests_per_window` calls per `window`.
    pub requests_per_window: u32,
    pub window: Duration,
    /// Market metadata cache TTL. Zero disables caching.
    pub cache_ttl: Duration,
    /// Series count above which merges switch to the streaming strategy.
    pub streaming_threshold: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            clob_base_url: String::from("https://clob.polymarket.com"),
            gamma_base_url: String::from("https://gamma-api.polymarket.com"),
            data_base_url: String::from("https://data-api.polymarket.com"),
            api_key: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
            requests_per_window: 60,
            window: Duration::from_secs(60),
            cache_ttl: Duration::from_secs(300),
            streaming_threshold: 10,
        }
    }
}
