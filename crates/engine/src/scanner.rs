use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::{stream, StreamExt};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use common::{
    Error, Interval, MarketDataClient, Result, ScanStatus, ScanSummary, SignalEvent, StrategyKind,
};
use notifier::Notifier;
use strategy::volatility::daily_range_pct;
use strategy::{Evaluator, StrategyConfig, SymbolStrategy, VolatilityStrategy};

use crate::RateLimiter;

/// Per-scanner pacing and identity, taken from one `[[strategy]]` entry.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub name: String,
    pub quote_asset: String,
    pub interval: Duration,
    /// Minimum spacing between per-symbol evaluations.
    pub symbol_delay: Duration,
    /// Pause after every emitted alert.
    pub alert_delay: Duration,
    /// Per-symbol evaluations in flight at once.
    pub concurrency: usize,
}

impl ScanSettings {
    pub fn from_config(cfg: &StrategyConfig) -> Self {
        Self {
            name: cfg.name.clone(),
            quote_asset: cfg.quote_asset.clone(),
            interval: Duration::from_secs(cfg.interval_secs),
            symbol_delay: Duration::from_millis(cfg.symbol_delay_ms),
            alert_delay: Duration::from_millis(cfg.alert_delay_ms),
            concurrency: cfg.concurrency.max(1),
        }
    }
}

/// Runs scan passes for one configured strategy.
///
/// At most one pass runs at a time; a second `run_scan` while one is in
/// flight fails with `ScanInProgress` instead of waiting.
pub struct Scanner {
    settings: ScanSettings,
    evaluator: Arc<Evaluator>,
    client: Arc<dyn MarketDataClient>,
    notifier: Notifier,
    limiter: RateLimiter,
    in_flight: Arc<AtomicBool>,
}

/// Held for the duration of a pass; clears the in-flight flag on drop,
/// including when the pass future is cancelled.
struct ScanPermit(Arc<AtomicBool>);

impl Drop for ScanPermit {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Running totals for one pass.
#[derive(Debug, Default)]
struct Tally {
    universe: usize,
    scanned: usize,
    failed: usize,
    matches: usize,
    alerted: usize,
}

impl Scanner {
    pub fn new(
        settings: ScanSettings,
        evaluator: Arc<Evaluator>,
        client: Arc<dyn MarketDataClient>,
        notifier: Notifier,
    ) -> Self {
        let limiter = RateLimiter::per_period(settings.symbol_delay);
        Self {
            settings,
            evaluator,
            client,
            notifier,
            limiter,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    pub fn kind(&self) -> StrategyKind {
        self.evaluator.kind()
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Shared view for the liveness endpoint.
    pub fn status(&self) -> ScanStatus {
        ScanStatus {
            name: self.settings.name.clone(),
            strategy: self.kind(),
            in_flight: self.in_flight.clone(),
        }
    }

    fn try_begin(&self) -> Result<ScanPermit> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::ScanInProgress(self.settings.name.clone()))?;
        Ok(ScanPermit(self.in_flight.clone()))
    }

    /// Run one full pass: universe, per-symbol evaluation, alerts, summary.
    ///
    /// Per-symbol failures are counted and skipped. A failed universe fetch
    /// aborts the pass with `UniverseFetchFailed` before anything is sent:
    /// that path produces no `ScanSummary` and no summary message, and the
    /// caller treats it as a pass with zero matches.
    pub async fn run_scan(&self) -> Result<ScanSummary> {
        let _permit = self.try_begin()?;
        let scan_id = Uuid::new_v4();
        let span = info_span!(
            "scan",
            %scan_id,
            name = %self.settings.name,
            strategy = %self.kind()
        );
        self.run_pass(scan_id).instrument(span).await
    }

    async fn run_pass(&self, scan_id: Uuid) -> Result<ScanSummary> {
        let started_at = Utc::now();
        info!("Scan started");

        let tally = match self.evaluator.as_ref() {
            Evaluator::PerSymbol(strategy) => self.scan_symbols(strategy.as_ref()).await,
            Evaluator::Volatility(strategy) => self.scan_volatility(strategy).await,
        }
        .inspect_err(|e| warn!(error = %e, "Scan aborted"))?;

        let summary = ScanSummary {
            scan_id,
            strategy: self.kind(),
            name: self.settings.name.clone(),
            universe: tally.universe,
            scanned: tally.scanned,
            failed: tally.failed,
            matches: tally.matches,
            alerted: tally.alerted,
            params: self.evaluator.params(),
            interval_secs: self.settings.interval.as_secs(),
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            universe = summary.universe,
            scanned = summary.scanned,
            failed = summary.failed,
            matches = summary.matches,
            alerted = summary.alerted,
            "Scan complete"
        );

        if summary.should_emit() {
            self.notifier.notify_summary(&summary).await;
        } else {
            info!("No matches, no signal sent");
        }

        Ok(summary)
    }

    // ─── Per-symbol strategies ───────────────────────────────────────────────

    async fn scan_symbols(&self, strategy: &dyn SymbolStrategy) -> Result<Tally> {
        let quote = &self.settings.quote_asset;
        let symbols = self
            .client
            .list_symbols(quote, strategy.universe())
            .await
            .map_err(|e| Error::UniverseFetchFailed(e.to_string()))?;
        if symbols.is_empty() {
            return Err(Error::UniverseFetchFailed(format!(
                "no {quote} symbols listed"
            )));
        }
        info!(symbols = symbols.len(), "Universe loaded");

        // breakout passes count every attempted symbol; the others only
        // symbols whose data came back usable
        let count_attempts = strategy.kind() == StrategyKind::PdhBreakout;

        let mut tally = Tally {
            universe: symbols.len(),
            ..Tally::default()
        };

        let mut outcomes = stream::iter(symbols)
            .map(|symbol| async move {
                let outcome = self.evaluate_symbol(strategy, &symbol).await;
                (symbol, outcome)
            })
            .buffer_unordered(self.settings.concurrency);

        while let Some((symbol, outcome)) = outcomes.next().await {
            match outcome {
                Ok(None) => tally.scanned += 1,
                Ok(Some(event)) => {
                    tally.scanned += 1;
                    tally.matches += 1;
                    info!(symbol = %symbol, metrics = ?event.metrics, "Signal");
                    self.emit(&event, &mut tally).await;
                }
                Err(e) => {
                    if count_attempts {
                        tally.scanned += 1;
                    }
                    tally.failed += 1;
                    warn!(symbol = %symbol, class = e.class(), error = %e, "Symbol skipped");
                }
            }
        }

        Ok(tally)
    }

    async fn evaluate_symbol(
        &self,
        strategy: &dyn SymbolStrategy,
        symbol: &str,
    ) -> Result<Option<SignalEvent>> {
        self.limiter.acquire().await;

        let series = self
            .client
            .candles(symbol, Interval::Day1, strategy.candle_limit())
            .await?;
        let price = self.client.current_price(symbol).await?;

        let Some(event) = strategy.evaluate(&series, price, Utc::now())? else {
            return Ok(None);
        };

        if strategy.wants_volume() {
            let stats = self.client.stats_24h(symbol).await?;
            return Ok(Some(event.with_metric("volume_24h", stats.volume)));
        }
        Ok(Some(event))
    }

    // ─── Volatility ──────────────────────────────────────────────────────────

    async fn scan_volatility(&self, strategy: &VolatilityStrategy) -> Result<Tally> {
        let tickers = self
            .client
            .tickers_24h(&self.settings.quote_asset)
            .await
            .map_err(|e| Error::UniverseFetchFailed(e.to_string()))?;

        let ranking = strategy.rank(&tickers);
        info!(
            tickers = tickers.len(),
            passed = ranking.passed,
            top = ranking.top.len(),
            "Tickers ranked"
        );

        let mut tally = Tally {
            universe: tickers.len(),
            scanned: tickers.len(),
            matches: ranking.passed,
            ..Tally::default()
        };

        for (i, ticker) in ranking.top.iter().enumerate() {
            self.limiter.acquire().await;
            let range = match self
                .client
                .candles(&ticker.symbol, Interval::Day1, VolatilityStrategy::RANGE_CANDLES)
                .await
            {
                Ok(series) => daily_range_pct(&series),
                Err(e) => {
                    warn!(symbol = %ticker.symbol, error = %e, "Daily range unavailable");
                    None
                }
            };

            let event = strategy.event(ticker, i + 1, range, Utc::now());
            self.emit(&event, &mut tally).await;
        }

        Ok(tally)
    }

    /// Send one alert and pause before the pass continues.
    async fn emit(&self, event: &SignalEvent, tally: &mut Tally) {
        tally.alerted += 1;
        if !self.notifier.notify_signal(event, &self.settings.quote_asset).await {
            warn!(symbol = %event.symbol, "Alert not delivered");
        }
        if !self.settings.alert_delay.is_zero() {
            tokio::time::sleep(self.settings.alert_delay).await;
        }
    }
}
