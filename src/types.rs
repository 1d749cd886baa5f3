use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Price records
// ---------------------------------------------------------------------------

/// One validated daily bar, keyed by (ticker, trade_date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub ticker: String,
    pub trade_date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// The latest bar as returned by the API, before validation.
/// A field is `None` when the payload omitted it, sent null, or sent a non-numeric string.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedBar {
    pub ticker: String,
    pub trade_date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<i64>,
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Configured list only.
    Static,
    /// Top gainers only.
    Dynamic,
    /// Configured list followed by top gainers.
    #[default]
    Hybrid,
}

impl SelectionMode {
    /// Case-insensitive parse. Returns `None` for anything unrecognized so the
    /// caller can log before falling back to `Hybrid`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "static" => Some(SelectionMode::Static),
            "dynamic" => Some(SelectionMode::Dynamic),
            "hybrid" => Some(SelectionMode::Hybrid),
            _ => None,
        }
    }
}

impl std::fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SelectionMode::Static => "static",
            SelectionMode::Dynamic => "dynamic",
            SelectionMode::Hybrid => "hybrid",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Market movers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoverCategory {
    TopGainers,
    TopLosers,
    MostActive,
}

impl MoverCategory {
    /// Key of the list in the TOP_GAINERS_LOSERS response.
    pub fn response_key(&self) -> &'static str {
        match self {
            MoverCategory::TopGainers => "top_gainers",
            MoverCategory::TopLosers => "top_losers",
            MoverCategory::MostActive => "most_actively_traded",
        }
    }
}

impl std::fmt::Display for MoverCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.response_key())
    }
}

/// Ranking input only; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketMoverEntry {
    pub ticker: String,
    /// Signed percent, e.g. `-12.0` for `"-12.0%"`.
    pub change_percentage: f64,
    pub volume: i64,
}
