use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use common::{
    Candle, CandleSeries, Error, Interval, MarketDataClient, Result, StrategyKind, Ticker24h,
    UniversePolicy,
};

/// Which Binance REST API a client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Venue {
    /// Spot market, `/api/v3`.
    Spot,
    /// USDT-margined futures, `/fapi/v1`.
    Futures,
}

impl Venue {
    /// The breakout scan runs on perpetual futures; the others on spot.
    pub fn for_strategy(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::PdhBreakout => Venue::Futures,
            StrategyKind::EmaCross | StrategyKind::Volatility => Venue::Spot,
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            Venue::Spot => "/api/v3",
            Venue::Futures => "/fapi/v1",
        }
    }
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Venue::Spot => write!(f, "spot"),
            Venue::Futures => write!(f, "futures"),
        }
    }
}

/// Unauthenticated REST client for Binance market data.
///
/// Every request carries a timeout: `timeout` for per-symbol calls,
/// `listing_timeout` for the heavier exchange-wide listings.
pub struct BinanceClient {
    http: Client,
    base_url: String,
    venue: Venue,
    listing_timeout: Duration,
}

impl BinanceClient {
    pub fn new(
        venue: Venue,
        base_url: impl Into<String>,
        timeout: Duration,
        listing_timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            venue,
            listing_timeout,
        })
    }

    async fn get(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        timeout: Option<Duration>,
    ) -> Result<String> {
        let url = format!("{}{}{}", self.base_url, self.venue.prefix(), endpoint);
        debug!(url = %url, ?params, "GET request");

        let mut request = self.http.get(&url).query(params);
        if let Some(t) = timeout {
            request = request.timeout(t);
        }

        let resp = request.send().await.map_err(|e| transport_error(endpoint, e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| transport_error(endpoint, e))?;

        if !status.is_success() {
            return Err(Error::Exchange {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    async fn all_tickers(&self, quote_asset: &str) -> Result<Vec<Ticker24h>> {
        let body = self.get("/ticker/24hr", &[], Some(self.listing_timeout)).await?;
        parse_tickers(&body, quote_asset)
    }
}

fn transport_error(endpoint: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(format!("{endpoint}: {e}"))
    } else if e.is_decode() {
        Error::Decode(format!("{endpoint}: {e}"))
    } else {
        Error::Http(format!("{endpoint}: {e}"))
    }
}

#[async_trait]
impl MarketDataClient for BinanceClient {
    async fn list_symbols(
        &self,
        quote_asset: &str,
        policy: UniversePolicy,
    ) -> Result<Vec<String>> {
        match policy {
            UniversePolicy::TopByVolume { limit } => {
                let tickers = self.all_tickers(quote_asset).await?;
                Ok(rank_by_quote_volume(tickers, limit))
            }
            UniversePolicy::AllPerpetuals => {
                if self.venue != Venue::Futures {
                    return Err(Error::UnsupportedVenue(format!(
                        "perpetual listing needs the futures venue, client is {}",
                        self.venue
                    )));
                }
                let body = self
                    .get("/exchangeInfo", &[], Some(self.listing_timeout))
                    .await?;
                let info: ExchangeInfo = serde_json::from_str(&body)?;
                Ok(perpetual_symbols(info, quote_asset))
            }
        }
    }

    async fn tickers_24h(&self, quote_asset: &str) -> Result<Vec<Ticker24h>> {
        self.all_tickers(quote_asset).await
    }

    async fn candles(
        &self,
        symbol: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<CandleSeries> {
        let params = [
            ("symbol", symbol.to_string()),
            ("interval", interval.as_str().to_string()),
            ("limit", limit.to_string()),
        ];
        let body = self.get("/klines", &params, None).await?;
        parse_klines(symbol, interval, &body)
    }

    async fn current_price(&self, symbol: &str) -> Result<f64> {
        let body = self
            .get("/ticker/price", &[("symbol", symbol.to_string())], None)
            .await?;
        let ticker: PriceTicker = serde_json::from_str(&body)?;
        parse_num(&ticker.price, "price")
    }

    async fn stats_24h(&self, symbol: &str) -> Result<Ticker24h> {
        let body = self
            .get("/ticker/24hr", &[("symbol", symbol.to_string())], None)
            .await?;
        let raw: TickerResponse = serde_json::from_str(&body)?;
        raw.try_into()
    }
}

// ─── Decoding ─────────────────────────────────────────────────────────────────

/// Decode a `/klines` array-of-arrays body:
/// `[openTime, "open", "high", "low", "close", "volume", closeTime, ...]`.
pub fn parse_klines(symbol: &str, interval: Interval, body: &str) -> Result<CandleSeries> {
    let rows: Vec<Vec<Value>> = serde_json::from_str(body)?;

    let candles = rows
        .iter()
        .map(|row| {
            if row.len() < 6 {
                return Err(Error::Decode(format!(
                    "{symbol}: kline row has {} fields",
                    row.len()
                )));
            }
            let open_ms = row[0]
                .as_i64()
                .ok_or_else(|| Error::Decode(format!("{symbol}: kline open time")))?;
            let open_time = Utc
                .timestamp_millis_opt(open_ms)
                .single()
                .ok_or_else(|| Error::Decode(format!("{symbol}: kline open time {open_ms}")))?;
            Ok(Candle {
                open_time,
                open: value_num(&row[1], "open")?,
                high: value_num(&row[2], "high")?,
                low: value_num(&row[3], "low")?,
                close: value_num(&row[4], "close")?,
                volume: value_num(&row[5], "volume")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CandleSeries::new(symbol, interval, candles))
}

/// Decode a `/ticker/24hr` listing, keeping symbols quoted in `quote_asset`.
/// Individual entries that fail to decode are dropped.
pub fn parse_tickers(body: &str, quote_asset: &str) -> Result<Vec<Ticker24h>> {
    let entries: Vec<Value> = serde_json::from_str(body)?;
    let total = entries.len();

    let tickers: Vec<Ticker24h> = entries
        .into_iter()
        .filter_map(|entry| {
            let raw: TickerResponse = serde_json::from_value(entry).ok()?;
            if !raw.symbol.ends_with(quote_asset) {
                return None;
            }
            match Ticker24h::try_from(raw) {
                Ok(t) => Some(t),
                Err(e) => {
                    debug!(error = %e, "Dropping undecodable ticker");
                    None
                }
            }
        })
        .collect();

    debug!(total, kept = tickers.len(), quote_asset, "Decoded 24h tickers");
    Ok(tickers)
}

/// Highest quote volume first, truncated to `limit`.
pub fn rank_by_quote_volume(mut tickers: Vec<Ticker24h>, limit: usize) -> Vec<String> {
    tickers.sort_by(|a, b| b.quote_volume.total_cmp(&a.quote_volume));
    tickers.into_iter().take(limit).map(|t| t.symbol).collect()
}

fn perpetual_symbols(info: ExchangeInfo, quote_asset: &str) -> Vec<String> {
    info.symbols
        .into_iter()
        .filter(|s| {
            s.quote_asset == quote_asset
                && s.contract_type.as_deref() == Some("PERPETUAL")
                && s.status == "TRADING"
                && s.symbol.ends_with(quote_asset)
        })
        .map(|s| s.symbol)
        .collect()
}

fn parse_num(raw: &str, field: &str) -> Result<f64> {
    raw.parse::<f64>()
        .map_err(|e| Error::Decode(format!("{field} '{raw}': {e}")))
}

fn value_num(v: &Value, field: &str) -> Result<f64> {
    match v {
        Value::String(s) => parse_num(s, field),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| Error::Decode(format!("{field}: {n}"))),
        other => Err(Error::Decode(format!("{field}: unexpected {other}"))),
    }
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct PriceTicker {
    price: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TickerResponse {
    symbol: String,
    volume: String,
    quote_volume: String,
    price_change_percent: String,
    last_price: String,
}

impl TryFrom<TickerResponse> for Ticker24h {
    type Error = Error;

    fn try_from(raw: TickerResponse) -> Result<Self> {
        Ok(Ticker24h {
            volume: parse_num(&raw.volume, "volume")?,
            quote_volume: parse_num(&raw.quote_volume, "quoteVolume")?,
            price_change_percent: parse_num(&raw.price_change_percent, "priceChangePercent")?,
            last_price: parse_num(&raw.last_price, "lastPrice")?,
            symbol: raw.symbol,
        })
    }
}

#[derive(Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    quote_asset: String,
    status: String,
    #[serde(default)]
    contract_type: Option<String>,
}
