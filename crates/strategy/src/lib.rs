pub mod breakout;
pub mod config;
pub mod ema_cross;
pub mod indicators;
pub mod registry;
pub mod volatility;

pub use breakout::PdhBreakoutStrategy;
pub use config::{StrategyConfig, StrategyFileConfig};
pub use ema_cross::EmaCrossStrategy;
pub use registry::{Evaluator, RegisteredStrategy, StrategyRegistry};
pub use volatility::{VolatilityRanking, VolatilityStrategy};

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::{CandleSeries, Result, SignalEvent, StrategyKind, UniversePolicy};

/// A strategy decided one symbol at a time from that symbol's candles and
/// its current price.
///
/// Implementations hold no mutable state: the same inputs always produce
/// the same outcome.
pub trait SymbolStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// How the symbol universe is drawn for this strategy.
    fn universe(&self) -> UniversePolicy;

    /// Daily candles to request per symbol.
    fn candle_limit(&self) -> usize;

    /// Whether a match must be enriched with 24h volume before alerting.
    fn wants_volume(&self) -> bool {
        false
    }

    /// Strategy parameters as reported in pass summaries.
    fn params(&self) -> BTreeMap<String, f64>;

    /// Evaluate one symbol.
    ///
    /// `Err` means the data could not support the computation (the symbol
    /// is skipped), `Ok(None)` means the condition was not met.
    fn evaluate(
        &self,
        series: &CandleSeries,
        price: f64,
        at: DateTime<Utc>,
    ) -> Result<Option<SignalEvent>>;
}

/// Percent distance of `price` above `level`.
pub(crate) fn pct_above(price: f64, level: f64) -> f64 {
    (price - level) / level * 100.0
}
