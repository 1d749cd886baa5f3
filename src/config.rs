use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::types::SelectionMode;

pub const ALPHAVANTAGE_BASE_URL: &str = "https://www.alphavantage.co/query";

/// Tickers processed in Static mode and at the front of Hybrid mode when
/// STATIC_TICKERS is not set.
pub const DEFAULT_STATIC_TICKERS: &[&str] = &["MSFT", "AAPL", "GOOGL"];

/// Top gainers taken in Dynamic mode.
pub const DEFAULT_DYNAMIC_COUNT: usize = 10;

/// Top gainers appended after the static list in Hybrid mode.
pub const DEFAULT_HYBRID_DYNAMIC_COUNT: usize = 7;

/// Per-request timeout for the market data API (seconds).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// "compact" = last 100 data points; "full" = full history.
pub const SERIES_OUTPUT_SIZE: &str = "compact";

#[derive(Debug, Clone)]
pub struct Config {
    /// Market data API key (ALPHAVANTAGE_API_KEY). Required.
    pub api_key: Option<String>,
    /// sqlx connection URL, e.g. `sqlite://prices.db?mode=rwc` (DATABASE_URL). Required.
    pub database_url: Option<String>,
    pub base_url: String,
    pub selection_mode: SelectionMode,
    /// Comma-separated (STATIC_TICKERS)
    pub static_tickers: Vec<String>,
    pub dynamic_count: usize,
    pub hybrid_dynamic_count: usize,
    pub request_timeout: Duration,
    /// Write validated records of the run here when set (CSV_EXPORT_PATH).
    pub csv_export_path: Option<PathBuf>,
    pub log_level: String,
    /// Problems tolerated while parsing, logged once tracing is up.
    pub warnings: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut warnings = Vec::new();

        let selection_mode = match get("SELECTION_MODE") {
            None => SelectionMode::default(),
            Some(raw) => SelectionMode::parse(&raw).unwrap_or_else(|| {
                warnings.push(format!("Unrecognized SELECTION_MODE {raw:?}, falling back to hybrid"));
                SelectionMode::Hybrid
            }),
        };

        let static_tickers = match get("STATIC_TICKERS") {
            Some(raw) => parse_ticker_list(&raw),
            None => DEFAULT_STATIC_TICKERS.iter().map(|s| s.to_string()).collect(),
        };

        Ok(Self {
            api_key: get("ALPHAVANTAGE_API_KEY"),
            database_url: get("DATABASE_URL"),
            base_url: get("ALPHAVANTAGE_BASE_URL")
                .unwrap_or_else(|| ALPHAVANTAGE_BASE_URL.to_string()),
            selection_mode,
            static_tickers,
            dynamic_count: parse_or(get("DYNAMIC_COUNT"), "DYNAMIC_COUNT", DEFAULT_DYNAMIC_COUNT)?,
            hybrid_dynamic_count: parse_or(
                get("HYBRID_DYNAMIC_COUNT"),
                "HYBRID_DYNAMIC_COUNT",
                DEFAULT_HYBRID_DYNAMIC_COUNT,
            )?,
            request_timeout: Duration::from_secs(parse_or(
                get("REQUEST_TIMEOUT_SECS"),
                "REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            csv_export_path: get("CSV_EXPORT_PATH").map(PathBuf::from),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            warnings,
        })
    }

    /// Fails with every missing required setting named, before any I/O is attempted.
    pub fn check(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.api_key.is_none() {
            missing.push("ALPHAVANTAGE_API_KEY");
        }
        if self.database_url.is_none() {
            missing.push("DATABASE_URL");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::Config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )))
        }
    }

    pub fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AppError::Config("ALPHAVANTAGE_API_KEY is not set".to_string()))
    }

    pub fn database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| AppError::Config("DATABASE_URL is not set".to_string()))
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, name: &str, default: T) -> Result<T> {
    match raw {
        None => Ok(default),
        Some(s) => s
            .parse::<T>()
            .map_err(|_| AppError::Config(format!("{name} must be a non-negative integer, got {s:?}"))),
    }
}

fn parse_ticker_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn cfg_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = cfg_from(&[]).unwrap();
        assert_eq!(cfg.selection_mode, SelectionMode::Hybrid);
        assert_eq!(cfg.static_tickers, vec!["MSFT", "AAPL", "GOOGL"]);
        assert_eq!(cfg.dynamic_count, DEFAULT_DYNAMIC_COUNT);
        assert_eq!(cfg.hybrid_dynamic_count, DEFAULT_HYBRID_DYNAMIC_COUNT);
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
        assert_eq!(cfg.base_url, ALPHAVANTAGE_BASE_URL);
        assert!(cfg.csv_export_path.is_none());
    }

    #[test]
    fn check_names_every_missing_setting() {
        let cfg = cfg_from(&[]).unwrap();
        let err = cfg.check().unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, AppError::Config(_)));
        assert!(msg.contains("ALPHAVANTAGE_API_KEY"));
        assert!(msg.contains("DATABASE_URL"));
    }

    #[test]
    fn blank_credentials_count_as_missing() {
        let cfg = cfg_from(&[("ALPHAVANTAGE_API_KEY", "  "), ("DATABASE_URL", "sqlite::memory:")])
            .unwrap();
        let msg = cfg.check().unwrap_err().to_string();
        assert!(msg.contains("ALPHAVANTAGE_API_KEY"));
        assert!(!msg.contains("DATABASE_URL"));
    }

    #[test]
    fn check_passes_with_credentials() {
        let cfg = cfg_from(&[("ALPHAVANTAGE_API_KEY", "demo"), ("DATABASE_URL", "sqlite::memory:")])
            .unwrap();
        assert!(cfg.check().is_ok());
        assert_eq!(cfg.api_key().unwrap(), "demo");
    }

    #[test]
    fn unknown_mode_falls_back_to_hybrid() {
        let cfg = cfg_from(&[("SELECTION_MODE", "momentum")]).unwrap();
        assert_eq!(cfg.selection_mode, SelectionMode::Hybrid);
        assert_eq!(cfg.warnings.len(), 1);
        let cfg = cfg_from(&[("SELECTION_MODE", "Static")]).unwrap();
        assert_eq!(cfg.selection_mode, SelectionMode::Static);
    }

    #[test]
    fn static_tickers_are_trimmed_and_uppercased() {
        let cfg = cfg_from(&[("STATIC_TICKERS", " ibm, nvda,,tsla ")]).unwrap();
        assert_eq!(cfg.static_tickers, vec!["IBM", "NVDA", "TSLA"]);
    }

    #[test]
    fn bad_count_is_config_error() {
        let err = cfg_from(&[("DYNAMIC_COUNT", "ten")]).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
