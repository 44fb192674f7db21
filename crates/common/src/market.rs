use async_trait::async_trait;

use crate::{CandleSeries, Interval, Result, Ticker24h};

/// How a strategy's symbol universe is drawn from the provider.
///
/// The two policies are distinct retrieval paths and are never merged:
/// one ranks and truncates, the other returns the full tradable set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniversePolicy {
    /// Quote-matching symbols ranked by 24h quote volume, highest first,
    /// truncated to `limit`.
    TopByVolume { limit: usize },
    /// Every perpetual contract in `TRADING` status for the quote asset.
    AllPerpetuals,
}

/// Read-only market data provider.
///
/// `BinanceClient` in `crates/engine` implements this against the REST API.
/// Every call is an independent request with a bounded timeout; a timeout,
/// non-success status or undecodable payload is returned as an error and
/// never replaced by a zero value.
#[async_trait]
pub trait MarketDataClient: Send + Sync {
    /// Symbols ending in `quote_asset`, selected by `policy`.
    async fn list_symbols(&self, quote_asset: &str, policy: UniversePolicy)
        -> Result<Vec<String>>;

    /// 24h statistics for every symbol ending in `quote_asset`.
    async fn tickers_24h(&self, quote_asset: &str) -> Result<Vec<Ticker24h>>;

    /// The most recent `limit` candles for `symbol`, oldest first.
    async fn candles(&self, symbol: &str, interval: Interval, limit: usize)
        -> Result<CandleSeries>;

    /// Latest traded price for `symbol`.
    async fn current_price(&self, symbol: &str) -> Result<f64>;

    /// 24h statistics for a single symbol.
    async fn stats_24h(&self, symbol: &str) -> Result<Ticker24h>;
}
