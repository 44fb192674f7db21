use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use common::{Error, Result, StrategyKind};

/// Top-level strategy config file (TOML).
///
/// Example `config/strategies.toml`:
/// ```toml
/// [[strategy]]
/// type = "pdh_breakout"
/// name = "PDH Breakout"
/// interval_secs = 3600
///
/// [strategy.params]
/// min_breakout_pct = 0.5
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyFileConfig {
    #[serde(rename = "strategy")]
    pub strategies: Vec<StrategyConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyConfig {
    /// Strategy type identifier: "ema_cross", "pdh_breakout" or "volatility".
    #[serde(rename = "type")]
    pub strategy_type: String,
    /// Human-readable name shown in logs and messages.
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Quote asset that scopes the universe, e.g. "USDT".
    #[serde(default = "default_quote_asset")]
    pub quote_asset: String,
    /// Seconds between scheduled passes.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Minimum spacing between per-symbol evaluations.
    #[serde(default = "default_symbol_delay_ms")]
    pub symbol_delay_ms: u64,
    /// Pause after each emitted alert.
    #[serde(default = "default_alert_delay_ms")]
    pub alert_delay_ms: u64,
    /// Per-symbol evaluations allowed in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Strategy-specific parameters.
    #[serde(default)]
    pub params: HashMap<String, toml::Value>,
}

fn default_enabled() -> bool {
    true
}

fn default_quote_asset() -> String {
    "USDT".to_string()
}

fn default_interval_secs() -> u64 {
    3600
}

fn default_symbol_delay_ms() -> u64 {
    100
}

fn default_alert_delay_ms() -> u64 {
    1000
}

fn default_concurrency() -> usize {
    1
}

impl StrategyConfig {
    pub fn kind(&self) -> Result<StrategyKind> {
        StrategyKind::parse(&self.strategy_type).ok_or_else(|| {
            Error::Config(format!(
                "strategy '{}' has unknown type '{}'",
                self.name, self.strategy_type
            ))
        })
    }
}

impl StrategyFileConfig {
    /// Load from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read strategy config at '{path}': {e}"))
        })?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("failed to parse strategy config at '{path}': {e}")))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let file: Self = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        for cfg in &file.strategies {
            cfg.kind()?;
            if cfg.interval_secs == 0 {
                return Err(Error::Config(format!(
                    "strategy '{}' needs a non-zero interval_secs",
                    cfg.name
                )));
            }
        }
        Ok(file)
    }
}
