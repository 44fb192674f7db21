use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Error, Result};

/// One OHLCV record.
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Candle timeframe. Only daily candles are scanned today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Day1,
}

impl Interval {
    /// Binance wire code for this interval.
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Day1 => "1d",
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Candles for one symbol at one interval, ordered oldest → newest.
/// The last candle is usually the current, still-forming one.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleSeries {
    pub symbol: String,
    pub interval: Interval,
    pub candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(symbol: impl Into<String>, interval: Interval, candles: Vec<Candle>) -> Self {
        Self {
            symbol: symbol.into(),
            interval,
            candles,
        }
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// Fails with `InsufficientData` when fewer than `min` candles are held.
    pub fn require(&self, min: usize) -> Result<()> {
        if self.candles.len() < min {
            return Err(Error::InsufficientData {
                symbol: self.symbol.clone(),
                needed: min,
                got: self.candles.len(),
            });
        }
        Ok(())
    }
}

/// 24h rolling statistics for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticker24h {
    pub symbol: String,
    /// Base-asset volume.
    pub volume: f64,
    /// Quote-asset volume (e.g. USDT traded).
    pub quote_volume: f64,
    pub price_change_percent: f64,
    pub last_price: f64,
}

/// The three scan strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    EmaCross,
    PdhBreakout,
    Volatility,
}

/// When a pass summary is sent to the messaging sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryPolicy {
    /// Only when the pass produced at least one match.
    OnMatches,
    /// After every completed pass, including empty ones.
    Always,
}

impl StrategyKind {
    pub fn summary_policy(&self) -> SummaryPolicy {
        match self {
            StrategyKind::EmaCross | StrategyKind::PdhBreakout => SummaryPolicy::OnMatches,
            StrategyKind::Volatility => SummaryPolicy::Always,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ema_cross" => Some(StrategyKind::EmaCross),
            "pdh_breakout" => Some(StrategyKind::PdhBreakout),
            "volatility" => Some(StrategyKind::Volatility),
            _ => None,
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::EmaCross => write!(f, "ema_cross"),
            StrategyKind::PdhBreakout => write!(f, "pdh_breakout"),
            StrategyKind::Volatility => write!(f, "volatility"),
        }
    }
}

/// A qualifying symbol found during one pass. Sent to the notifier once.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalEvent {
    pub symbol: String,
    pub strategy: StrategyKind,
    pub metrics: BTreeMap<String, f64>,
    pub timestamp: DateTime<Utc>,
}

impl SignalEvent {
    pub fn new(symbol: impl Into<String>, strategy: StrategyKind, at: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            strategy,
            metrics: BTreeMap::new(),
            timestamp: at,
        }
    }

    pub fn with_metric(mut self, key: &str, value: f64) -> Self {
        self.metrics.insert(key.to_string(), value);
        self
    }

    pub fn metric(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).copied()
    }
}

/// Totals for one completed pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSummary {
    pub scan_id: Uuid,
    pub strategy: StrategyKind,
    /// Configured strategy instance name.
    pub name: String,
    /// Symbols in the universe this pass.
    pub universe: usize,
    /// Symbols counted as scanned (counting rule differs per strategy).
    pub scanned: usize,
    /// Symbols skipped because their data was unavailable.
    pub failed: usize,
    /// Symbols that met the signal condition.
    pub matches: usize,
    /// Signal notifications attempted.
    pub alerted: usize,
    pub params: BTreeMap<String, f64>,
    pub interval_secs: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ScanSummary {
    /// Whether this summary is sent, per the strategy's policy.
    pub fn should_emit(&self) -> bool {
        match self.strategy.summary_policy() {
            SummaryPolicy::Always => true,
            SummaryPolicy::OnMatches => self.matches > 0,
        }
    }
}

/// Shared liveness view of one configured scanner.
#[derive(Debug, Clone)]
pub struct ScanStatus {
    pub name: String,
    pub strategy: StrategyKind,
    pub in_flight: Arc<AtomicBool>,
}

impl ScanStatus {
    pub fn is_scanning(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}
