use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use common::{CandleSeries, SignalEvent, StrategyKind, Ticker24h};

/// 24h volatility burst filter over every quote-matching ticker.
///
/// Filtering and notification are separate caps: any number of tickers may
/// pass the filter, only the `max_alerts` most volatile are alerted.
#[derive(Debug, Clone)]
pub struct VolatilityStrategy {
    pub min_volume: f64,
    pub min_change_pct: f64,
    pub min_price: f64,
    pub max_alerts: usize,
}

/// Result of ranking one pass worth of tickers.
#[derive(Debug, Clone, PartialEq)]
pub struct VolatilityRanking {
    /// Tickers that passed the filter.
    pub passed: usize,
    /// The most volatile passing tickers, highest |change| first.
    pub top: Vec<Ticker24h>,
}

impl VolatilityStrategy {
    pub const DEFAULT_MIN_VOLUME: f64 = 1_000_000.0;
    pub const DEFAULT_MIN_CHANGE_PCT: f64 = 15.0;
    pub const DEFAULT_MIN_PRICE: f64 = 0.01;
    pub const DEFAULT_MAX_ALERTS: usize = 20;

    /// Daily candles fetched for the prior-day range of a top ticker.
    pub const RANGE_CANDLES: usize = 2;

    pub fn passes(&self, ticker: &Ticker24h) -> bool {
        ticker.quote_volume >= self.min_volume
            && ticker.price_change_percent.abs() >= self.min_change_pct
            && ticker.last_price > self.min_price
    }

    pub fn rank(&self, tickers: &[Ticker24h]) -> VolatilityRanking {
        let mut passing: Vec<Ticker24h> =
            tickers.iter().filter(|t| self.passes(t)).cloned().collect();
        let passed = passing.len();

        passing.sort_by(|a, b| {
            b.price_change_percent
                .abs()
                .total_cmp(&a.price_change_percent.abs())
        });
        passing.truncate(self.max_alerts);

        VolatilityRanking {
            passed,
            top: passing,
        }
    }

    /// Build the alert for a ranked ticker. `rank` is 1-based.
    pub fn event(
        &self,
        ticker: &Ticker24h,
        rank: usize,
        daily_range_pct: Option<f64>,
        at: DateTime<Utc>,
    ) -> SignalEvent {
        let event = SignalEvent::new(&ticker.symbol, StrategyKind::Volatility, at)
            .with_metric("rank", rank as f64)
            .with_metric("price", ticker.last_price)
            .with_metric("change_pct", ticker.price_change_percent)
            .with_metric("volatility", ticker.price_change_percent.abs())
            .with_metric("quote_volume", ticker.quote_volume);
        match daily_range_pct {
            Some(range) => event.with_metric("daily_range_pct", range),
            None => event,
        }
    }

    pub fn params(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("min_volume".to_string(), self.min_volume),
            ("min_change_pct".to_string(), self.min_change_pct),
            ("min_price".to_string(), self.min_price),
            ("max_alerts".to_string(), self.max_alerts as f64),
        ])
    }
}

impl Default for VolatilityStrategy {
    fn default() -> Self {
        Self {
            min_volume: Self::DEFAULT_MIN_VOLUME,
            min_change_pct: Self::DEFAULT_MIN_CHANGE_PCT,
            min_price: Self::DEFAULT_MIN_PRICE,
            max_alerts: Self::DEFAULT_MAX_ALERTS,
        }
    }
}

/// Prior-day high/low range in percent of the low.
/// `None` if the series lacks a prior day or the low is not positive.
pub fn daily_range_pct(series: &CandleSeries) -> Option<f64> {
    if series.candles.len() < VolatilityStrategy::RANGE_CANDLES {
        return None;
    }
    let prior = &series.candles[series.candles.len() - 2];
    if prior.low <= 0.0 {
        return None;
    }
    Some((prior.high - prior.low) / prior.low * 100.0)
}
