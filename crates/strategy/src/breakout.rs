use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use common::{CandleSeries, Error, Result, SignalEvent, StrategyKind, UniversePolicy};

use crate::{pct_above, SymbolStrategy};

/// Prior-day-high breakout across all perpetual contracts.
///
/// Needs the two latest daily candles: the prior (closed) day and the
/// current one. Fires when price clears the prior day's high by strictly
/// more than `min_breakout_pct` percent.
#[derive(Debug, Clone)]
pub struct PdhBreakoutStrategy {
    min_breakout_pct: f64,
}

/// Levels behind a confirmed breakout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakout {
    pub pdh: f64,
    pub prior_close: f64,
    pub above_pct: f64,
}

impl PdhBreakoutStrategy {
    pub const DEFAULT_MIN_BREAKOUT_PCT: f64 = 0.5;
    const CANDLES: usize = 2;

    pub fn new(min_breakout_pct: f64) -> Self {
        Self { min_breakout_pct }
    }

    /// Check the breakout condition against the prior day of `series`.
    pub fn check(&self, series: &CandleSeries, price: f64) -> Result<Option<Breakout>> {
        series.require(Self::CANDLES)?;

        let prior = &series.candles[series.candles.len() - 2];
        let pdh = prior.high;
        if pdh.is_nan() || pdh <= 0.0 {
            return Err(Error::Decode(format!(
                "{}: non-positive prior day high {pdh}",
                series.symbol
            )));
        }

        // (price - pdh) / pdh > pct / 100, kept in multiplied form so the
        // boundary itself compares exactly
        let clears = price > pdh && (price - pdh) * 100.0 > self.min_breakout_pct * pdh;
        if !clears {
            return Ok(None);
        }

        Ok(Some(Breakout {
            pdh,
            prior_close: prior.close,
            above_pct: pct_above(price, pdh),
        }))
    }
}

impl Default for PdhBreakoutStrategy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIN_BREAKOUT_PCT)
    }
}

impl SymbolStrategy for PdhBreakoutStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PdhBreakout
    }

    fn universe(&self) -> UniversePolicy {
        UniversePolicy::AllPerpetuals
    }

    fn candle_limit(&self) -> usize {
        Self::CANDLES
    }

    fn wants_volume(&self) -> bool {
        true
    }

    fn params(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([("min_breakout_pct".to_string(), self.min_breakout_pct)])
    }

    fn evaluate(
        &self,
        series: &CandleSeries,
        price: f64,
        at: DateTime<Utc>,
    ) -> Result<Option<SignalEvent>> {
        Ok(self.check(series, price)?.map(|b| {
            SignalEvent::new(&series.symbol, StrategyKind::PdhBreakout, at)
                .with_metric("price", price)
                .with_metric("pdh", b.pdh)
                .with_metric("prior_close", b.prior_close)
                .with_metric("above_pct", b.above_pct)
        }))
    }
}
