use std::time::Duration;

/// All process configuration loaded from environment variables at startup.
/// Missing required variables cause an immediate panic with a clear message.
/// Per-strategy settings live in the strategy TOML file, not here.
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub telegram_token: String,
    pub telegram_chat_id: String,

    // Liveness endpoint
    pub health_port: u16,

    // Market data provider
    pub binance_spot_url: String,
    pub binance_futures_url: String,
    pub http_timeout: Duration,
    pub listing_timeout: Duration,

    // Notifications
    pub notify_timeout: Duration,

    // Strategy config file path
    pub strategy_config_path: String,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present. Panics on any missing required variable.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        Config {
            telegram_token: required_env("TELEGRAM_TOKEN"),
            telegram_chat_id: required_env("TELEGRAM_CHAT_ID"),
            health_port: optional_env("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            binance_spot_url: optional_env("BINANCE_SPOT_URL")
                .unwrap_or_else(|| "https://api.binance.com".to_string()),
            binance_futures_url: optional_env("BINANCE_FUTURES_URL")
                .unwrap_or_else(|| "https://fapi.binance.com".to_string()),
            http_timeout: secs_env("HTTP_TIMEOUT_SECS", 10),
            listing_timeout: secs_env("LISTING_TIMEOUT_SECS", 30),
            notify_timeout: secs_env("NOTIFY_TIMEOUT_SECS", 10),
            strategy_config_path: optional_env("STRATEGY_CONFIG_PATH")
                .unwrap_or_else(|| "config/strategies.toml".to_string()),
        }
    }
}

fn required_env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        panic!("Required environment variable '{key}' is not set. Check your .env file.")
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn secs_env(key: &str, default: u64) -> Duration {
    let secs = match optional_env(key) {
        Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, default, "Ignoring non-numeric timeout");
            default
        }),
        None => default,
    };
    Duration::from_secs(secs)
}
