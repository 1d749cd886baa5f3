use tracing::warn;

use crate::error::AppError;
use crate::types::{FetchedBar, PriceRecord};

/// Check a fetched bar for completeness and numeric sanity.
///
/// Rejects a missing price or volume, a price that is not strictly positive,
/// and a negative volume. Zero volume is accepted. An inverted high/low range
/// is logged but passed through.
pub fn validate(bar: &FetchedBar) -> Result<PriceRecord, AppError> {
    let open = require_price(bar.open, "open")?;
    let high = require_price(bar.high, "high")?;
    let low = require_price(bar.low, "low")?;
    let close = require_price(bar.close, "close")?;

    let volume = bar
        .volume
        .ok_or_else(|| AppError::Validation("volume is missing".to_string()))?;
    if volume < 0 {
        return Err(AppError::Validation(format!("volume is negative: {volume}")));
    }

    if high < low {
        warn!(
            ticker = %bar.ticker,
            trade_date = %bar.trade_date,
            "high {high} is below low {low}; keeping record"
        );
    }

    Ok(PriceRecord {
        ticker: bar.ticker.clone(),
        trade_date: bar.trade_date,
        open,
        high,
        low,
        close,
        volume,
    })
}

fn require_price(value: Option<f64>, field: &str) -> Result<f64, AppError> {
    match value {
        None => Err(AppError::Validation(format!("{field} is missing"))),
        Some(v) if !v.is_finite() || v <= 0.0 => {
            Err(AppError::Validation(format!("{field} must be positive, got {v}")))
        }
        Some(v) => Ok(v),
    }
}
