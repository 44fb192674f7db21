use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use common::{Config, MarketDataClient, MessageSink};
use engine::{BinanceClient, ScanScheduler, ScanSettings, Scanner, Venue};
use notifier::{Notifier, StartupNotice, TelegramSink};
use strategy::{StrategyFileConfig, StrategyRegistry};

#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    info!(config = %cfg.strategy_config_path, "ScanBot starting");

    let strategy_file = StrategyFileConfig::load(&cfg.strategy_config_path)
        .unwrap_or_else(|e| panic!("Failed to load strategy config: {e}"));
    let registry = StrategyRegistry::from_config(&strategy_file)
        .unwrap_or_else(|e| panic!("Invalid strategy config: {e}"));
    if registry.is_empty() {
        warn!("No enabled strategies; only the health endpoint will run");
    }

    // ── Notifications ─────────────────────────────────────────────────────────
    let sink: Arc<dyn MessageSink> =
        Arc::new(TelegramSink::new(cfg.telegram_token.clone(), &cfg.telegram_chat_id));
    let notifier = Notifier::new(sink, cfg.notify_timeout);

    // ── Scanners ──────────────────────────────────────────────────────────────
    let mut statuses = Vec::new();
    for registered in registry.strategies() {
        let kind = registered.evaluator.kind();
        let venue = Venue::for_strategy(kind);
        let base_url = match venue {
            Venue::Spot => &cfg.binance_spot_url,
            Venue::Futures => &cfg.binance_futures_url,
        };
        let client: Arc<dyn MarketDataClient> = Arc::new(
            BinanceClient::new(venue, base_url.as_str(), cfg.http_timeout, cfg.listing_timeout)
                .unwrap_or_else(|e| panic!("Failed to build market data client: {e}")),
        );

        let scanner = Arc::new(Scanner::new(
            ScanSettings::from_config(&registered.config),
            registered.evaluator.clone(),
            client,
            notifier.clone(),
        ));
        statuses.push(scanner.status());

        let notice = StartupNotice {
            name: registered.config.name.clone(),
            strategy: kind,
            interval_secs: registered.config.interval_secs,
            quote_asset: registered.config.quote_asset.clone(),
            params: registered.evaluator.params(),
            started_at: chrono::Utc::now(),
        };
        if !notifier.notify_startup(&notice).await {
            warn!(name = %notice.name, "Startup notice not delivered");
        }

        info!(name = %registered.config.name, strategy = %kind, %venue, "Scanner scheduled");
        tokio::spawn(ScanScheduler::new(scanner).run());
    }

    // ── Health endpoint ───────────────────────────────────────────────────────
    let port = cfg.health_port;
    let api_state = api::AppState::new(statuses);
    tokio::spawn(async move {
        if let Err(e) = api::serve(api_state, port).await {
            error!(port, error = %e, "Health endpoint stopped");
        }
    });

    // Keep main alive
    info!("All scanners started. Waiting for shutdown signal.");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received. Exiting.");
}
