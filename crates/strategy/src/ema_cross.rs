use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use common::{CandleSeries, Error, Result, SignalEvent, StrategyKind, UniversePolicy};

use crate::indicators::EmaIndicator;
use crate::{pct_above, SymbolStrategy};

/// Fast and slow EMA values at one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmaPair {
    pub fast: f64,
    pub slow: f64,
}

/// A fresh bullish crossover: yesterday fast < slow, today price > fast > slow.
///
/// A crossover that already happened on an earlier bar does not qualify.
/// Previous values that are missing or zero never qualify.
pub fn is_fresh_crossover(price: f64, current: EmaPair, previous: Option<EmaPair>) -> bool {
    let Some(prev) = previous else {
        return false;
    };
    if prev.fast == 0.0 || prev.slow == 0.0 {
        return false;
    }
    price > current.fast && current.fast > current.slow && prev.fast < prev.slow
}

/// Daily fast/slow EMA crossover over the top symbols by volume.
#[derive(Debug, Clone)]
pub struct EmaCrossStrategy {
    fast: EmaIndicator,
    slow: EmaIndicator,
    min_candles: usize,
    candle_limit: usize,
    top_n: usize,
}

impl EmaCrossStrategy {
    pub const DEFAULT_FAST: usize = 9;
    pub const DEFAULT_SLOW: usize = 20;
    pub const DEFAULT_MIN_CANDLES: usize = 30;
    pub const DEFAULT_CANDLE_LIMIT: usize = 50;
    pub const DEFAULT_TOP_N: usize = 600;

    pub fn new(
        fast: usize,
        slow: usize,
        min_candles: usize,
        candle_limit: usize,
        top_n: usize,
    ) -> Self {
        assert!(fast < slow, "EMA fast period must be less than slow period");
        // the previous-bar EMA needs one extra candle
        let min_candles = min_candles.max(slow + 1);
        Self {
            fast: EmaIndicator::new(fast),
            slow: EmaIndicator::new(slow),
            min_candles,
            candle_limit: candle_limit.max(min_candles),
            top_n,
        }
    }

    fn pair_at(&self, closes: &[f64]) -> Option<EmaPair> {
        Some(EmaPair {
            fast: self.fast.compute(closes)?,
            slow: self.slow.compute(closes)?,
        })
    }
}

impl Default for EmaCrossStrategy {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_FAST,
            Self::DEFAULT_SLOW,
            Self::DEFAULT_MIN_CANDLES,
            Self::DEFAULT_CANDLE_LIMIT,
            Self::DEFAULT_TOP_N,
        )
    }
}

impl SymbolStrategy for EmaCrossStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::EmaCross
    }

    fn universe(&self) -> UniversePolicy {
        UniversePolicy::TopByVolume { limit: self.top_n }
    }

    fn candle_limit(&self) -> usize {
        self.candle_limit
    }

    fn params(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("fast".to_string(), self.fast.period as f64),
            ("slow".to_string(), self.slow.period as f64),
            ("min_candles".to_string(), self.min_candles as f64),
            ("top_n".to_string(), self.top_n as f64),
        ])
    }

    fn evaluate(
        &self,
        series: &CandleSeries,
        price: f64,
        at: DateTime<Utc>,
    ) -> Result<Option<SignalEvent>> {
        series.require(self.min_candles)?;

        let closes = series.closes();
        let current = self.pair_at(&closes).ok_or_else(|| Error::InsufficientData {
            symbol: series.symbol.clone(),
            needed: self.slow.period,
            got: closes.len(),
        })?;
        let previous = self.pair_at(&closes[..closes.len() - 1]);

        if !is_fresh_crossover(price, current, previous) {
            return Ok(None);
        }

        Ok(Some(
            SignalEvent::new(&series.symbol, StrategyKind::EmaCross, at)
                .with_metric("price", price)
                .with_metric("ema_fast", current.fast)
                .with_metric("ema_slow", current.slow)
                .with_metric("fast_period", self.fast.period as f64)
                .with_metric("slow_period", self.slow.period as f64)
                .with_metric("above_fast_pct", pct_above(price, current.fast))
                .with_metric("above_slow_pct", pct_above(price, current.slow)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Candle, Interval};

    fn series_from_closes(symbol: &str, closes: &[f64]) -> CandleSeries {
        let candles = closes
            .iter()
            .map(|&c| Candle {
                open_time: Utc::now(),
                open: c,
                high: c,
                low: c,
                close: c,
                volume: 1.0,
            })
            .collect();
        CandleSeries::new(symbol, Interval::Day1, candles)
    }

    /// 29 closes falling by 1 from 100, then a spike to 200.
    /// Previous bar: EMA9 = 76, EMA20 = 81.5. Current: EMA9 = 100.8, EMA20 ≈ 92.79.
    fn fresh_cross_closes() -> Vec<f64> {
        let mut closes: Vec<f64> = (0..29).map(|i| 100.0 - i as f64).collect();
        closes.push(200.0);
        closes
    }

    #[test]
    fn fresh_crossover_fires() {
        let strategy = EmaCrossStrategy::default();
        let series = series_from_closes("BUSDT", &fresh_cross_closes());
        let event = strategy.evaluate(&series, 200.0, Utc::now()).unwrap().unwrap();

        assert_eq!(event.symbol, "BUSDT");
        assert_eq!(event.strategy, StrategyKind::EmaCross);
        let fast = event.metric("ema_fast").unwrap();
        let slow = event.metric("ema_slow").unwrap();
        assert!((fast - 100.8).abs() < 1e-9, "got {fast}");
        assert!(fast > slow);
        assert!(event.metric("above_fast_pct").unwrap() > 0.0);
    }

    #[test]
    fn persisting_uptrend_does_not_fire() {
        let strategy = EmaCrossStrategy::default();
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let series = series_from_closes("AUSDT", &closes);
        assert!(strategy.evaluate(&series, 200.0, Utc::now()).unwrap().is_none());
    }

    #[test]
    fn price_below_fast_ema_does_not_fire() {
        let strategy = EmaCrossStrategy::default();
        let series = series_from_closes("BUSDT", &fresh_cross_closes());
        assert!(strategy.evaluate(&series, 99.0, Utc::now()).unwrap().is_none());
    }

    #[test]
    fn short_series_is_insufficient_data() {
        let strategy = EmaCrossStrategy::default();
        let series = series_from_closes("CUSDT", &[1.0; 29]);
        let err = strategy.evaluate(&series, 1.0, Utc::now()).unwrap_err();
        assert_eq!(err.class(), "insufficient_data");
    }

    #[test]
    fn crossover_requires_previous_fast_below_slow() {
        let current = EmaPair { fast: 11.0, slow: 10.0 };
        let below = EmaPair { fast: 9.0, slow: 10.0 };
        let equal = EmaPair { fast: 10.0, slow: 10.0 };
        let above = EmaPair { fast: 10.5, slow: 10.0 };

        assert!(is_fresh_crossover(12.0, current, Some(below)));
        assert!(!is_fresh_crossover(12.0, current, Some(equal)));
        assert!(!is_fresh_crossover(12.0, current, Some(above)));
    }

    #[test]
    fn crossover_rejects_missing_or_zero_previous() {
        let current = EmaPair { fast: 11.0, slow: 10.0 };
        assert!(!is_fresh_crossover(12.0, current, None));
        assert!(!is_fresh_crossover(12.0, current, Some(EmaPair { fast: 0.0, slow: 10.0 })));
        assert!(!is_fresh_crossover(12.0, current, Some(EmaPair { fast: 9.0, slow: 0.0 })));
    }

    #[test]
    fn crossover_requires_strict_ordering_today() {
        let prev = EmaPair { fast: 9.0, slow: 10.0 };
        assert!(!is_fresh_crossover(11.0, EmaPair { fast: 11.0, slow: 10.0 }, Some(prev)));
        assert!(!is_fresh_crossover(12.0, EmaPair { fast: 10.0, slow: 10.0 }, Some(prev)));
    }

    #[test]
    fn evaluation_is_idempotent() {
        let strategy = EmaCrossStrategy::default();
        let series = series_from_closes("BUSDT", &fresh_cross_closes());
        let at = Utc::now();
        let first = strategy.evaluate(&series, 200.0, at).unwrap();
        let second = strategy.evaluate(&series, 200.0, at).unwrap();
        assert_eq!(first, second);
    }
}
