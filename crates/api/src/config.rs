//! Application configuration loaded from environment variables.

use std::time::Duration;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `5100`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `SHIPPING_MAX_RETRIES` — label purchase poll ceiling (default: `5`)
/// - `SHIPPING_POLL_DELAY_SECS` — delay between label polls (default: `5`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// How many times the shipping consumer re-polls a queued label
    /// purchase before parking the event.
    pub shipping_max_retries: u32,
    pub shipping_poll_delay: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5100),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            shipping_max_retries: std::env::var("SHIPPING_MAX_RETRIES")
                .ok()
                .and_then(|n| n.parse().ok())
                .unwrap_or(5),
            shipping_poll_delay: std::env::var("SHIPPING_POLL_DELAY_SECS")
                .ok()
                .and_then(|n| n.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(5)),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5100,
            log_level: "info".to_string(),
            shipping_max_retries: 5,
            shipping_poll_delay: Duration::from_secs(5),
        }
    }
}
