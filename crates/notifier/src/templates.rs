//! Telegram HTML message templates, one per strategy.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use teloxide::utils::html::escape;

use common::{ScanSummary, SignalEvent, StrategyKind, SummaryPolicy};

/// What the one-time "system online" message describes.
#[derive(Debug, Clone)]
pub struct StartupNotice {
    pub name: String,
    pub strategy: StrategyKind,
    pub interval_secs: u64,
    pub quote_asset: String,
    pub params: BTreeMap<String, f64>,
    pub started_at: DateTime<Utc>,
}

/// `quote_asset` labels volume figures, e.g. `12.50M USDT`.
pub fn render_signal(event: &SignalEvent, quote_asset: &str) -> String {
    match event.strategy {
        StrategyKind::EmaCross => render_ema_signal(event),
        StrategyKind::PdhBreakout => render_pdh_signal(event),
        StrategyKind::Volatility => render_volatility_signal(event, quote_asset),
    }
}

pub fn render_summary(summary: &ScanSummary) -> String {
    let mut text = match summary.strategy {
        StrategyKind::EmaCross => format!(
            "📊 <b>EMA SCAN SUMMARY</b>\n\
             \n\
             ✅ Scan completed: {name}\n\
             🕒 {time}\n\
             🔍 Coins scanned: {scanned}\n\
             🚀 Signals found: {matches}\n\
             🔄 Next scan: {next}\n",
            name = escape(&summary.name),
            time = clock(summary.finished_at),
            scanned = summary.scanned,
            matches = summary.matches,
            next = format_interval(summary.interval_secs),
        ),
        StrategyKind::PdhBreakout => format!(
            "📊 <b>SCAN SUMMARY</b>\n\
             \n\
             ✅ Scan completed successfully: {name}\n\
             🕒 Time: {time}\n\
             🔍 Coins scanned: {scanned}\n\
             🚀 Breakouts found: {matches}\n\
             🔄 Next scan: {next}\n",
            name = escape(&summary.name),
            time = clock(summary.finished_at),
            scanned = summary.scanned,
            matches = summary.matches,
            next = format_interval(summary.interval_secs),
        ),
        StrategyKind::Volatility => format!(
            "📊 <b>VOLATILITY SCAN SUMMARY</b>\n\
             \n\
             ✅ Scan completed: {name}\n\
             🕒 {time}\n\
             🔍 Total coins: {universe}\n\
             🚨 High volatility: {matches}\n\
             📈 Top alerts: {alerted}\n\
             📊 Min volatility: {min_change}%\n\
             💰 Min volume: {min_volume}\n",
            name = escape(&summary.name),
            time = clock(summary.finished_at),
            universe = summary.universe,
            matches = summary.matches,
            alerted = summary.alerted,
            min_change = param(&summary.params, "min_change_pct"),
            min_volume = format_volume(param(&summary.params, "min_volume")),
        ),
    };

    if summary.failed > 0 {
        text.push_str(&format!("⚠️ Skipped (data unavailable): {}\n", summary.failed));
    }

    let tags = match summary.strategy {
        StrategyKind::EmaCross => format!("#EMA #{}Signals", summary.matches),
        StrategyKind::PdhBreakout => format!("#ScanComplete #{}Breakouts", summary.matches),
        StrategyKind::Volatility => format!("#VolatilityScan #{}Alerts", summary.alerted),
    };
    text.push('\n');
    text.push_str(&tags);
    text
}

pub fn render_startup(notice: &StartupNotice) -> String {
    let (title, setup, tag) = match notice.strategy {
        StrategyKind::EmaCross => (
            "EMA SCANNER ACTIVATED",
            format!(
                "{}EMA &gt; {}EMA crossover (daily)",
                param(&notice.params, "fast"),
                param(&notice.params, "slow")
            ),
            "#EMA #AutoScan",
        ),
        StrategyKind::PdhBreakout => (
            "PDH AUTO BREAKOUT BOT ACTIVATED",
            format!(
                "Prior-day-high breakouts above +{}%",
                param(&notice.params, "min_breakout_pct")
            ),
            "#BotOnline #AutoPDH",
        ),
        StrategyKind::Volatility => (
            "VOLATILITY SCANNER ACTIVATED",
            format!(
                "24h moves of {}%+ on {}+ volume",
                param(&notice.params, "min_change_pct"),
                format_volume(param(&notice.params, "min_volume"))
            ),
            "#Volatility #AutoScan",
        ),
    };

    let coverage = match notice.strategy {
        StrategyKind::EmaCross => format!(
            "Top {} {} pairs by volume",
            param(&notice.params, "top_n"),
            escape(&notice.quote_asset)
        ),
        StrategyKind::PdhBreakout => {
            format!("All {} perpetual futures", escape(&notice.quote_asset))
        }
        StrategyKind::Volatility => format!("All {} pairs", escape(&notice.quote_asset)),
    };

    let alerts = match notice.strategy.summary_policy() {
        SummaryPolicy::OnMatches => "ONLY when signals appear",
        SummaryPolicy::Always => "Top movers plus a summary every scan",
    };

    format!(
        "🤖 <b>{title}</b>\n\
         \n\
         ✅ System: ONLINE\n\
         🏷️ {name}\n\
         🕒 Started: {time}\n\
         🎯 Strategy: {setup}\n\
         ⏰ Schedule: Every {every}\n\
         🔍 Coverage: {coverage}\n\
         📱 Alerts: {alerts}\n\
         \n\
         {tag}",
        name = escape(&notice.name),
        time = clock(notice.started_at),
        every = format_interval(notice.interval_secs),
    )
}

fn render_ema_signal(event: &SignalEvent) -> String {
    let symbol = escape(&event.symbol);
    let fast = metric(event, "fast_period");
    let slow = metric(event, "slow_period");
    format!(
        "📈 <b>DAILY EMA CROSSOVER</b>\n\
         \n\
         🏷️ {symbol}\n\
         💰 ${price:.4}\n\
         📊 {fast}EMA: ${ema_fast:.4} ({above_fast:+.2}%)\n\
         📈 {slow}EMA: ${ema_slow:.4} ({above_slow:+.2}%)\n\
         🕒 {time}\n\
         \n\
         ✅ <b>CONFIRMED:</b> {fast}EMA &gt; {slow}EMA\n\
         🎯 <b>SETUP:</b> Bullish trend\n\
         🛑 <b>STOP:</b> Below {slow}EMA\n\
         \n\
         #EMA #{symbol}",
        price = metric(event, "price"),
        ema_fast = metric(event, "ema_fast"),
        ema_slow = metric(event, "ema_slow"),
        above_fast = metric(event, "above_fast_pct"),
        above_slow = metric(event, "above_slow_pct"),
        time = clock(event.timestamp),
    )
}

fn render_pdh_signal(event: &SignalEvent) -> String {
    let symbol = escape(&event.symbol);
    format!(
        "🚨 <b>PDH BREAKOUT DETECTED!</b> 🚨\n\
         \n\
         🏷️ <b>Symbol:</b> {symbol}.P\n\
         💰 <b>Current Price:</b> ${price:.4}\n\
         📈 <b>Above PDH:</b> +{above:.2}%\n\
         🎯 <b>PDH Level:</b> ${pdh:.4}\n\
         📊 <b>Yesterday Close:</b> ${prior_close:.4}\n\
         📈 <b>24h Volume:</b> {volume}\n\
         🕒 <b>Time:</b> {time}\n\
         \n\
         ✅ <b>Breakout confirmed!</b>\n\
         🎯 <b>Strategy:</b> Buy with stop below PDH\n\
         \n\
         #PDH #Breakout #{symbol}",
        price = metric(event, "price"),
        above = metric(event, "above_pct"),
        pdh = metric(event, "pdh"),
        prior_close = metric(event, "prior_close"),
        volume = event
            .metric("volume_24h")
            .map(thousands)
            .unwrap_or_else(|| "n/a".to_string()),
        time = clock(event.timestamp),
    )
}

fn render_volatility_signal(event: &SignalEvent, quote_asset: &str) -> String {
    let symbol = escape(&event.symbol);
    let change = metric(event, "change_pct");
    let direction = if change > 0.0 { "📈" } else { "📉" };
    let range = event
        .metric("daily_range_pct")
        .map(|r| format!("{r:.1}%"))
        .unwrap_or_else(|| "n/a".to_string());
    format!(
        "{direction} <b>HIGH VOLATILITY ALERT #{rank}</b>\n\
         \n\
         🏷️ {symbol}\n\
         💰 ${price:.4}\n\
         📈 24h Change: {change:+.1}%\n\
         🔥 Volatility: {volatility:.1}%\n\
         💰 24h Volume: {volume} {quote}\n\
         📊 Daily Range: {range}\n\
         \n\
         🕒 {time}\n\
         \n\
         ✅ <b>SETUP:</b> High momentum\n\
         🎯 <b>STRATEGY:</b> Breakout/Reversal\n\
         ⚠️ <b>RISK:</b> High volatility\n\
         \n\
         #Volatility #{symbol}",
        rank = metric(event, "rank"),
        price = metric(event, "price"),
        volatility = metric(event, "volatility"),
        volume = format_volume(metric(event, "quote_volume")),
        quote = escape(quote_asset),
        time = clock(event.timestamp),
    )
}

/// Compact volume: `1.23B`, `45.60M`, `7.8K`, `950`.
pub fn format_volume(volume: f64) -> String {
    if volume >= 1_000_000_000.0 {
        format!("{:.2}B", volume / 1_000_000_000.0)
    } else if volume >= 1_000_000.0 {
        format!("{:.2}M", volume / 1_000_000.0)
    } else if volume >= 1_000.0 {
        format!("{:.1}K", volume / 1_000.0)
    } else {
        format!("{volume:.0}")
    }
}

/// Whole number with comma thousands separators.
pub fn thousands(value: f64) -> String {
    let rounded = format!("{:.0}", value.abs());
    let mut out = String::with_capacity(rounded.len() + rounded.len() / 3);
    for (i, ch) in rounded.chars().enumerate() {
        if i > 0 && (rounded.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if value < 0.0 && rounded != "0" {
        out.insert(0, '-');
    }
    out
}

/// `3600` → `1 hour`, `7200` → `2 hours`, `900` → `15 min`.
pub fn format_interval(secs: u64) -> String {
    match secs {
        s if s >= 3600 && s % 3600 == 0 => {
            let h = s / 3600;
            if h == 1 {
                "1 hour".to_string()
            } else {
                format!("{h} hours")
            }
        }
        s if s >= 60 && s % 60 == 0 => format!("{} min", s / 60),
        s => format!("{s} s"),
    }
}

fn clock(at: DateTime<Utc>) -> String {
    at.format("%H:%M:%S UTC").to_string()
}

fn metric(event: &SignalEvent, key: &str) -> f64 {
    event.metric(key).unwrap_or(f64::NAN)
}

fn param(params: &BTreeMap<String, f64>, key: &str) -> f64 {
    params.get(key).copied().unwrap_or(f64::NAN)
}
