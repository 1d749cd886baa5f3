use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{Config, SERIES_OUTPUT_SIZE};
use crate::error::{AppError, Result};
use crate::types::{FetchedBar, MarketMoverEntry, MoverCategory};

pub const DAILY_SERIES_KEY: &str = "Time Series (Daily)";

/// Top-level keys the API uses to report errors and rate limiting inside a 200 body.
const API_ERROR_KEYS: &[&str] = &["Error Message", "Note", "Information"];

/// Source of daily bars and market movers. Every failure comes back as a
/// per-ticker error kind (transport, upstream, malformed); nothing panics.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Latest daily bar for `ticker`.
    async fn fetch_daily_series(&self, ticker: &str) -> Result<FetchedBar>;

    /// Top `count` ticker symbols for `category`, ranked over the full candidate list.
    async fn fetch_market_movers(&self, category: MoverCategory, count: usize) -> Result<Vec<String>>;
}

#[derive(Clone)]
pub struct MarketDataClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl MarketDataClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: cfg.base_url.clone(),
            api_key: cfg.api_key()?.to_string(),
        })
    }

    async fn get_json(&self, params: &[(&str, &str)]) -> Result<Value> {
        let body: Value = self
            .client
            .get(&self.base_url)
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body)
    }
}

#[async_trait]
impl MarketData for MarketDataClient {
    async fn fetch_daily_series(&self, ticker: &str) -> Result<FetchedBar> {
        let result: Result<FetchedBar> = async {
            let body = self
                .get_json(&[
                    ("function", "TIME_SERIES_DAILY"),
                    ("symbol", ticker),
                    ("outputsize", SERIES_OUTPUT_SIZE),
                ])
                .await?;
            parse_daily_series(ticker, &body)
        }
        .await;

        if let Err(e) = &result {
            warn!(ticker = %ticker, kind = e.kind(), "Daily series fetch failed: {e}");
        }
        result
    }

    async fn fetch_market_movers(&self, category: MoverCategory, count: usize) -> Result<Vec<String>> {
        let result: Result<Vec<String>> = async {
            let body = self.get_json(&[("function", "TOP_GAINERS_LOSERS")]).await?;
            let entries = parse_market_movers(&body, category)?;
            debug!("{} candidates under {category}", entries.len());
            Ok(rank_movers(entries, category, count))
        }
        .await;

        if let Err(e) = &result {
            warn!(category = %category, kind = e.kind(), "Market movers fetch failed: {e}");
        }
        result
    }
}

/// Reject bodies that carry an API-level error or rate-limit marker.
pub fn check_api_error(body: &Value) -> Result<()> {
    for key in API_ERROR_KEYS {
        if let Some(msg) = body.get(*key) {
            let msg = msg.as_str().map(str::to_string).unwrap_or_else(|| msg.to_string());
            return Err(AppError::Upstream(format!("{key}: {msg}")));
        }
    }
    Ok(())
}

/// Extract the latest bar from a TIME_SERIES_DAILY body.
///
/// The latest date is the lexicographically greatest key, which is the
/// chronologically latest because keys are `YYYY-MM-DD`. Price fields that
/// are missing or unparseable come back as `None` for the validator to reject.
pub fn parse_daily_series(ticker: &str, body: &Value) -> Result<FetchedBar> {
    check_api_error(body)?;

    let series = body
        .get(DAILY_SERIES_KEY)
        .and_then(|s| s.as_object())
        .ok_or_else(|| {
            AppError::MalformedResponse(format!("no \"{DAILY_SERIES_KEY}\" object in response"))
        })?;

    let (latest_date, latest) = series
        .iter()
        .max_by(|a, b| a.0.cmp(b.0))
        .ok_or_else(|| AppError::MalformedResponse("daily series is empty".to_string()))?;

    let trade_date = NaiveDate::parse_from_str(latest_date, "%Y-%m-%d").map_err(|_| {
        AppError::MalformedResponse(format!("series key {latest_date:?} is not an ISO date"))
    })?;

    if !latest.is_object() {
        return Err(AppError::MalformedResponse(format!(
            "entry for {latest_date} is not an object"
        )));
    }

    Ok(FetchedBar {
        ticker: ticker.to_string(),
        trade_date,
        open: latest.get("1. open").and_then(lenient_f64),
        high: latest.get("2. high").and_then(lenient_f64),
        low: latest.get("3. low").and_then(lenient_f64),
        close: latest.get("4. close").and_then(lenient_f64),
        volume: latest.get("5. volume").and_then(lenient_i64),
    })
}

/// Read the candidate list for `category` from a TOP_GAINERS_LOSERS body.
/// Entries with an unparseable ticker, percentage or volume are dropped.
pub fn parse_market_movers(body: &Value, category: MoverCategory) -> Result<Vec<MarketMoverEntry>> {
    check_api_error(body)?;

    let items = body
        .get(category.response_key())
        .and_then(|v| v.as_array())
        .ok_or_else(|| {
            AppError::MalformedResponse(format!(
                "no \"{}\" list in response",
                category.response_key()
            ))
        })?;

    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        let ticker = item.get("ticker").and_then(|t| t.as_str()).map(str::trim);
        let change = item.get("change_percentage").and_then(parse_percentage);
        let volume = item.get("volume").and_then(lenient_i64);

        match (ticker, change, volume) {
            (Some(t), Some(change_percentage), Some(volume)) if !t.is_empty() => {
                entries.push(MarketMoverEntry {
                    ticker: t.to_string(),
                    change_percentage,
                    volume,
                });
            }
            _ => debug!("Dropping unparseable {category} entry: {item}"),
        }
    }
    Ok(entries)
}

/// Rank the full candidate set, then truncate to `count`.
/// Gainers and losers rank by absolute percentage change, most active by volume.
/// Ties keep the order the API returned them in.
pub fn rank_movers(mut entries: Vec<MarketMoverEntry>, category: MoverCategory, count: usize) -> Vec<String> {
    match category {
        MoverCategory::TopGainers | MoverCategory::TopLosers => entries.sort_by(|a, b| {
            b.change_percentage
                .abs()
                .total_cmp(&a.change_percentage.abs())
        }),
        MoverCategory::MostActive => entries.sort_by(|a, b| b.volume.cmp(&a.volume)),
    }

    entries.into_iter().take(count).map(|e| e.ticker).collect()
}

/// `"-12.0%"` → `-12.0`.
fn parse_percentage(v: &Value) -> Option<f64> {
    if let Some(n) = v.as_f64() {
        return Some(n);
    }
    let s = v.as_str()?.trim();
    let s = s.strip_suffix('%').unwrap_or(s).trim();
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn lenient_f64(v: &Value) -> Option<f64> {
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        .filter(|n: &f64| n.is_finite())
}

fn lenient_i64(v: &Value) -> Option<i64> {
    v.as_i64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}
