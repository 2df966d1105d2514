use std::env;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Oracle streaming endpoint.
    pub hermes_ws_url: String,
    /// Oracle REST endpoint, for the startup price seed.
    pub hermes_api_url: String,
    /// Backend serving pairs, trades and daily closes.
    pub backend_api_url: String,
    /// Trader whose positions are watched.
    pub trader_address: Option<String>,
    /// Position list poll interval (seconds).
    pub poll_interval_secs: u64,
    /// Flat closing-fee rate for instruments without a fee schedule.
    pub flat_fee_rate: f64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            hermes_ws_url: env::var("HERMES_WS_URL")
                .unwrap_or_else(|_| "wss://hermes.pyth.network/ws".to_string()),
            hermes_api_url: env::var("HERMES_API_URL")
                .unwrap_or_else(|_| "https://hermes.pyth.network".to_string()),
            backend_api_url: env::var("BACKEND_API_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            trader_address: env::var("TRADER_ADDRESS").ok().filter(|s| !s.is_empty()),
            poll_interval_secs: env_parse("POLL_INTERVAL_SECS", 10),
            flat_fee_rate: env_parse("FLAT_FEE_RATE", 0.001),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
