use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::info;

use common::{Error, Result, StrategyKind};

use crate::config::{StrategyConfig, StrategyFileConfig};
use crate::{EmaCrossStrategy, PdhBreakoutStrategy, SymbolStrategy, VolatilityStrategy};

/// A built strategy, ready to be driven by a scanner.
///
/// Per-symbol strategies share one pipeline (candles + price per symbol);
/// volatility ranks the whole ticker list at once.
pub enum Evaluator {
    PerSymbol(Box<dyn SymbolStrategy>),
    Volatility(VolatilityStrategy),
}

impl Evaluator {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Evaluator::PerSymbol(s) => s.kind(),
            Evaluator::Volatility(_) => StrategyKind::Volatility,
        }
    }

    pub fn params(&self) -> BTreeMap<String, f64> {
        match self {
            Evaluator::PerSymbol(s) => s.params(),
            Evaluator::Volatility(s) => s.params(),
        }
    }
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("kind", &self.kind())
            .field("params", &self.params())
            .finish()
    }
}

/// One enabled `[[strategy]]` entry and its evaluator.
#[derive(Debug, Clone)]
pub struct RegisteredStrategy {
    pub config: StrategyConfig,
    pub evaluator: Arc<Evaluator>,
}

/// Holds every enabled strategy from the config file.
#[derive(Debug, Default)]
pub struct StrategyRegistry {
    strategies: Vec<RegisteredStrategy>,
}

impl StrategyRegistry {
    /// Build the registry from config. Disabled entries are skipped.
    pub fn from_config(file_cfg: &StrategyFileConfig) -> Result<Self> {
        let mut strategies = Vec::new();

        for cfg in &file_cfg.strategies {
            if !cfg.enabled {
                info!(name = %cfg.name, "Strategy disabled, skipping");
                continue;
            }
            let evaluator = build_evaluator(cfg).map_err(|e| {
                Error::Config(format!("strategy '{}' ({}): {e}", cfg.name, cfg.strategy_type))
            })?;
            info!(
                name = %cfg.name,
                strategy = %evaluator.kind(),
                interval_secs = cfg.interval_secs,
                "Registered strategy"
            );
            strategies.push(RegisteredStrategy {
                config: cfg.clone(),
                evaluator: Arc::new(evaluator),
            });
        }

        Ok(Self { strategies })
    }

    pub fn strategies(&self) -> &[RegisteredStrategy] {
        &self.strategies
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

// ─── Strategy builders ────────────────────────────────────────────────────────

pub fn build_evaluator(cfg: &StrategyConfig) -> Result<Evaluator, String> {
    let kind = cfg.kind().map_err(|e| e.to_string())?;
    match kind {
        StrategyKind::EmaCross => {
            let fast = param_usize(&cfg.params, "fast", EmaCrossStrategy::DEFAULT_FAST);
            let slow = param_usize(&cfg.params, "slow", EmaCrossStrategy::DEFAULT_SLOW);
            if fast == 0 || fast >= slow {
                return Err(format!("need 0 < fast < slow, got fast={fast} slow={slow}"));
            }
            let min_candles =
                param_usize(&cfg.params, "min_candles", EmaCrossStrategy::DEFAULT_MIN_CANDLES);
            let candle_limit =
                param_usize(&cfg.params, "candle_limit", EmaCrossStrategy::DEFAULT_CANDLE_LIMIT);
            let top_n = param_usize(&cfg.params, "top_n", EmaCrossStrategy::DEFAULT_TOP_N);
            Ok(Evaluator::PerSymbol(Box::new(EmaCrossStrategy::new(
                fast,
                slow,
                min_candles,
                candle_limit,
                top_n,
            ))))
        }
        StrategyKind::PdhBreakout => {
            let min_pct = param_f64(
                &cfg.params,
                "min_breakout_pct",
                PdhBreakoutStrategy::DEFAULT_MIN_BREAKOUT_PCT,
            );
            if min_pct < 0.0 {
                return Err(format!("min_breakout_pct must be >= 0, got {min_pct}"));
            }
            Ok(Evaluator::PerSymbol(Box::new(PdhBreakoutStrategy::new(min_pct))))
        }
        StrategyKind::Volatility => Ok(Evaluator::Volatility(VolatilityStrategy {
            min_volume: param_f64(&cfg.params, "min_volume", VolatilityStrategy::DEFAULT_MIN_VOLUME),
            min_change_pct: param_f64(
                &cfg.params,
                "min_change_pct",
                VolatilityStrategy::DEFAULT_MIN_CHANGE_PCT,
            ),
            min_price: param_f64(&cfg.params, "min_price", VolatilityStrategy::DEFAULT_MIN_PRICE),
            max_alerts: param_usize(&cfg.params, "max_alerts", VolatilityStrategy::DEFAULT_MAX_ALERTS),
        })),
    }
}

/// Float param; integer TOML values (`min_volume = 1000000`) are accepted too.
fn param_f64(params: &HashMap<String, toml::Value>, key: &str, default: f64) -> f64 {
    params
        .get(key)
        .and_then(|v| v.as_float().or_else(|| v.as_integer().map(|i| i as f64)))
        .unwrap_or(default)
}

fn param_usize(params: &HashMap<String, toml::Value>, key: &str, default: usize) -> usize {
    params
        .get(key)
        .and_then(|v| v.as_integer())
        .filter(|v| *v >= 0)
        .map(|v| v as usize)
        .unwrap_or(default)
}
