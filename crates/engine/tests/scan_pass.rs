
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;

use common::{Candle, Error, StrategyKind};
use engine::{ScanScheduler, ScanSettings, Scanner};
use mock_market::{ticker, MockMarket, MockSink};
use notifier::Notifier;
use strategy::registry::build_evaluator;
use strategy::StrategyFileConfig;

const EMA_FAST: &str = r#"
[[strategy]]
type = "ema_cross"
name = "Daily EMA"
symbol_delay_ms = 0
alert_delay_ms = 0
"#;

const PDH_FAST: &str = r#"
[[strategy]]
type = "pdh_breakout"
name = "PDH"
symbol_delay_ms = 0
alert_delay_ms = 0
"#;

const VOL_FAST: &str = r#"
[[strategy]]
type = "volatility"
name = "Volatility"
interval_secs = 60
symbol_delay_ms = 0
alert_delay_ms = 0
"#;

fn scanner(toml_src: &str, market: &MockMarket, sink: &MockSink) -> Scanner {
    let file = StrategyFileConfig::parse(toml_src).unwrap();
    let cfg = &file.strategies[0];
    let evaluator = Arc::new(build_evaluator(cfg).unwrap());
    let notifier = Notifier::new(Arc::new(sink.clone()), Duration::from_secs(5));
    Scanner::new(
        ScanSettings::from_config(cfg),
        evaluator,
        Arc::new(market.clone()),
        notifier,
    )
}

/// 29 closes falling from 100, then a spike: a fresh 9/20 crossover.
fn fresh_cross_closes() -> Vec<f64> {
    let mut closes: Vec<f64> = (0..29).map(|i| 100.0 - i as f64).collect();
    closes.push(200.0);
    closes
}

fn day(high: f64, low: f64, close: f64) -> Candle {
    Candle {
        open_time: Utc::now(),
        open: close,
        high,
        low,
        close,
        volume: 1_000.0,
    }
}

async fn ema_market() -> MockMarket {
    let market = MockMarket::new();
    market.set_symbols(&["AUSDT", "BUSDT", "CUSDT"]).await;
    market.insert_closes("AUSDT", &[100.0; 30]).await;
    market.insert_price("AUSDT", 100.0).await;
    market.insert_closes("BUSDT", &fresh_cross_closes()).await;
    market.insert_price("BUSDT", 200.0).await;
    // CUSDT has no data: every fetch times out
    market
}

// ─── Per-symbol strategies ────────────────────────────────────────────────────

#[tokio::test]
async fn ema_pass_alerts_once_and_survives_failed_symbol() {
    let market = ema_market().await;
    let sink = MockSink::new();
    let summary = scanner(EMA_FAST, &market, &sink).run_scan().await.unwrap();

    assert_eq!(summary.strategy, StrategyKind::EmaCross);
    assert_eq!(summary.universe, 3);
    assert_eq!(summary.scanned, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.matches, 1);
    assert_eq!(summary.alerted, 1);

    let messages = sink.messages().await;
    assert_eq!(messages.len(), 2);
    assert!(messages[0].contains("DAILY EMA CROSSOVER"));
    assert!(messages[0].contains("BUSDT"));
    assert!(messages[1].contains("EMA SCAN SUMMARY"));
    assert!(messages[1].contains("Signals found: 1"));
}

#[tokio::test]
async fn short_candle_limit_is_raised_to_cover_slow_ema() {
    let market = ema_market().await;
    let sink = MockSink::new();
    let summary = scanner(
        r#"
        [[strategy]]
        type = "ema_cross"
        name = "Daily EMA"
        symbol_delay_ms = 0
        alert_delay_ms = 0

        [strategy.params]
        min_candles = 10
        candle_limit = 15
        "#,
        &market,
        &sink,
    )
    .run_scan()
    .await
    .unwrap();

    assert_eq!(summary.scanned, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.matches, 1);
}

#[tokio::test]
async fn ema_pass_without_matches_sends_nothing() {
    let market = MockMarket::new();
    market.set_symbols(&["AUSDT"]).await;
    market.insert_closes("AUSDT", &[100.0; 30]).await;
    market.insert_price("AUSDT", 100.0).await;
    let sink = MockSink::new();

    let summary = scanner(EMA_FAST, &market, &sink).run_scan().await.unwrap();
    assert_eq!(summary.matches, 0);
    assert!(sink.messages().await.is_empty());
}

#[tokio::test]
async fn pdh_pass_with_zero_breakouts_is_silent() {
    let market = MockMarket::new();
    market.set_symbols(&["XUSDT", "YUSDT", "ZUSDT"]).await;
    for symbol in ["XUSDT", "YUSDT"] {
        market
            .insert_candles(symbol, vec![day(100.0, 95.0, 98.0), day(100.4, 98.0, 100.0)])
            .await;
    }
    market.insert_price("XUSDT", 100.4).await;
    market.insert_price("YUSDT", 99.0).await;
    let sink = MockSink::new();

    let summary = scanner(PDH_FAST, &market, &sink).run_scan().await.unwrap();

    assert_eq!(summary.matches, 0);
    // breakout passes count failed attempts as scanned
    assert_eq!(summary.scanned, 3);
    assert_eq!(summary.failed, 1);
    assert!(sink.messages().await.is_empty());
}

#[tokio::test]
async fn pdh_breakout_is_enriched_with_volume() {
    let market = MockMarket::new();
    market.set_symbols(&["SOLUSDT"]).await;
    market
        .insert_candles("SOLUSDT", vec![day(100.0, 95.0, 98.0), day(102.0, 99.0, 101.0)])
        .await;
    market.insert_price("SOLUSDT", 101.0).await;
    market.insert_stats(ticker("SOLUSDT", 3.0, 1_234_500.0, 100.0)).await;
    let sink = MockSink::new();

    let summary = scanner(PDH_FAST, &market, &sink).run_scan().await.unwrap();
    assert_eq!((summary.matches, summary.alerted), (1, 1));

    let messages = sink.messages().await;
    assert_eq!(messages.len(), 2);
    assert!(messages[0].contains("SOLUSDT.P"));
    assert!(messages[0].contains("+1.00%"));
    assert!(messages[0].contains("12,345"));
    assert!(messages[1].contains("Breakouts found: 1"));
}

#[tokio::test]
async fn pdh_breakout_without_volume_is_not_alerted() {
    let market = MockMarket::new();
    market.set_symbols(&["SOLUSDT"]).await;
    market
        .insert_candles("SOLUSDT", vec![day(100.0, 95.0, 98.0), day(102.0, 99.0, 101.0)])
        .await;
    market.insert_price("SOLUSDT", 101.0).await;
    let sink = MockSink::new();

    let summary = scanner(PDH_FAST, &market, &sink).run_scan().await.unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.alerted, 0);
    assert!(sink.messages().await.is_empty());
}

#[tokio::test]
async fn failed_universe_aborts_pass_without_messages() {
    let market = MockMarket::new();
    let sink = MockSink::new();

    let err = scanner(EMA_FAST, &market, &sink).run_scan().await.unwrap_err();
    assert!(matches!(err, Error::UniverseFetchFailed(_)), "got {err:?}");

    market.set_symbols(&[]).await;
    let err = scanner(PDH_FAST, &market, &sink).run_scan().await.unwrap_err();
    assert!(matches!(err, Error::UniverseFetchFailed(_)), "got {err:?}");

    assert!(sink.messages().await.is_empty());
}

// ─── Volatility ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn volatility_alerts_only_the_top_twenty() {
    let market = MockMarket::new();
    let mut tickers: Vec<_> = (0..25)
        .map(|i| {
            let change = 16.0 + i as f64;
            let signed = if i % 2 == 0 { change } else { -change };
            ticker(&format!("P{i}USDT"), signed, 2_000_000.0, 1.0)
        })
        .collect();
    tickers.push(ticker("LOWVOLUSDT", 50.0, 100_000.0, 1.0));
    tickers.push(ticker("PENNYUSDT", 50.0, 5_000_000.0, 0.005));
    tickers.push(ticker("CALMUSDT", 3.0, 9_000_000.0, 10.0));
    market.set_tickers(tickers).await;
    market
        .insert_candles("P24USDT", vec![day(12.0, 10.0, 11.0), day(13.0, 11.0, 12.0)])
        .await;
    let sink = MockSink::new();

    let summary = scanner(VOL_FAST, &market, &sink).run_scan().await.unwrap();
    assert_eq!(summary.universe, 28);
    assert_eq!(summary.matches, 25);
    assert_eq!(summary.alerted, 20);

    let messages = sink.messages().await;
    assert_eq!(messages.len(), 21);
    assert!(messages[0].contains("HIGH VOLATILITY ALERT #1"));
    assert!(messages[0].contains("P24USDT"));
    assert!(messages[0].contains("Daily Range: 20.0%"));
    assert!(messages[0].contains("24h Volume: 2.00M USDT"));
    assert!(messages[1].contains("P23USDT"));
    assert!(messages[1].contains("Daily Range: n/a"));
    assert!(messages.iter().all(|m| !m.contains("P4USDT\n")));
    assert!(messages[20].contains("High volatility: 25"));
    assert!(messages[20].contains("Top alerts: 20"));
}

#[tokio::test]
async fn volatility_summary_is_sent_with_zero_matches() {
    let market = MockMarket::new();
    market
        .set_tickers(vec![ticker("CALMUSDT", 2.0, 9_000_000.0, 10.0)])
        .await;
    let sink = MockSink::new();

    let summary = scanner(VOL_FAST, &market, &sink).run_scan().await.unwrap();
    assert_eq!(summary.matches, 0);

    let messages = sink.messages().await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("VOLATILITY SCAN SUMMARY"));
    assert!(messages[0].contains("High volatility: 0"));
}

// ─── Orchestration ────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn second_scan_is_rejected_while_one_is_in_flight() {
    let market = ema_market().await;
    *market.listing_delay.lock().await = Duration::from_secs(5);
    let sink = MockSink::new();
    let scanner = Arc::new(scanner(EMA_FAST, &market, &sink));

    let first = tokio::spawn({
        let scanner = scanner.clone();
        async move { scanner.run_scan().await }
    });
    tokio::task::yield_now().await;

    assert!(scanner.is_running());
    assert!(scanner.status().is_scanning());
    let err = scanner.run_scan().await.unwrap_err();
    assert!(matches!(err, Error::ScanInProgress(_)), "got {err:?}");

    let summary = first.await.unwrap().unwrap();
    assert_eq!(summary.matches, 1);
    assert!(!scanner.is_running());

    // the flag is released, so the next pass runs
    assert!(scanner.run_scan().await.is_ok());
}

#[tokio::test]
async fn concurrent_scan_runs_on_a_spawned_task() {
    let market = ema_market().await;
    let sink = MockSink::new();
    let scanner = Arc::new(scanner(
        r#"
        [[strategy]]
        type = "ema_cross"
        name = "Daily EMA"
        symbol_delay_ms = 0
        alert_delay_ms = 0
        concurrency = 3
        "#,
        &market,
        &sink,
    ));

    let summary = tokio::spawn(async move { scanner.run_scan().await })
        .await
        .unwrap()
        .unwrap();
    assert_eq!((summary.scanned, summary.failed, summary.matches), (2, 1, 1));
    assert_eq!(sink.messages().await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn pacing_spaces_symbols_and_pauses_after_alerts() {
    let market = ema_market().await;
    let sink = MockSink::new();
    let scanner = scanner(
        r#"
        [[strategy]]
        type = "ema_cross"
        name = "Daily EMA"
        "#,
        &market,
        &sink,
    );

    let start = Instant::now();
    scanner.run_scan().await.unwrap();
    // A at once, B after 100ms, then 1s after B's alert
    assert!(start.elapsed() >= Duration::from_millis(1100), "{:?}", start.elapsed());
}

#[tokio::test(start_paused = true)]
async fn scheduler_survives_failed_passes() {
    let market = MockMarket::new();
    let sink = MockSink::new();
    let scanner = Arc::new(scanner(VOL_FAST, &market, &sink));

    let scheduler = ScanScheduler::new(scanner.clone());
    assert!(scheduler.run_once().await.is_none());

    let handle = tokio::spawn(ScanScheduler::new(scanner).run());

    // passes at 0s, 60s and 120s all fail on the ticker listing
    tokio::time::sleep(Duration::from_secs(150)).await;
    assert!(sink.messages().await.is_empty());

    market.set_tickers(Vec::new()).await;
    tokio::time::sleep(Duration::from_secs(60)).await;

    let messages = sink.messages().await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("VOLATILITY SCAN SUMMARY"));

    handle.abort();
}
