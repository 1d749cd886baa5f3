use tracing::{info, warn};

use crate::config::Config;
use crate::market_data::MarketData;
use crate::types::{MoverCategory, SelectionMode};

/// Decides which tickers a run processes.
#[derive(Debug, Clone)]
pub struct StockSelector {
    mode: SelectionMode,
    static_tickers: Vec<String>,
    dynamic_count: usize,
    hybrid_dynamic_count: usize,
}

impl StockSelector {
    pub fn new(
        mode: SelectionMode,
        static_tickers: Vec<String>,
        dynamic_count: usize,
        hybrid_dynamic_count: usize,
    ) -> Self {
        Self { mode, static_tickers, dynamic_count, hybrid_dynamic_count }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            cfg.selection_mode,
            cfg.static_tickers.clone(),
            cfg.dynamic_count,
            cfg.hybrid_dynamic_count,
        )
    }

    /// Ordered ticker list for this run.
    ///
    /// Hybrid puts the static list first and does not deduplicate against the
    /// gainers. A movers failure yields an empty dynamic half.
    pub async fn select(&self, source: &dyn MarketData) -> Vec<String> {
        let tickers = match self.mode {
            SelectionMode::Static => self.static_tickers.clone(),
            SelectionMode::Dynamic => top_gainers(source, self.dynamic_count).await,
            SelectionMode::Hybrid => {
                let mut tickers = self.static_tickers.clone();
                tickers.extend(top_gainers(source, self.hybrid_dynamic_count).await);
                tickers
            }
        };

        info!(mode = %self.mode, count = tickers.len(), "Selected tickers: {}", tickers.join(","));
        tickers
    }
}

async fn top_gainers(source: &dyn MarketData, count: usize) -> Vec<String> {
    if count == 0 {
        return Vec::new();
    }
    match source.fetch_market_movers(MoverCategory::TopGainers, count).await {
        Ok(tickers) => tickers,
        Err(e) => {
            warn!("No dynamic tickers this run: {e}");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, Result};
    use crate::types::FetchedBar;
    use async_trait::async_trait;

    /// Returns `G1..Gn` as gainers, or an upstream error.
    struct Movers {
        available: usize,
        fail: bool,
    }

    #[async_trait]
    impl MarketData for Movers {
        async fn fetch_daily_series(&self, ticker: &str) -> Result<FetchedBar> {
            Err(AppError::Transport(format!("not used: {ticker}")))
        }

        async fn fetch_market_movers(&self, category: MoverCategory, count: usize) -> Result<Vec<String>> {
            assert_eq!(category, MoverCategory::TopGainers);
            if self.fail {
                return Err(AppError::Upstream("Note: rate limited".into()));
            }
            Ok((1..=self.available).take(count).map(|i| format!("G{i}")).collect())
        }
    }

    fn static_list() -> Vec<String> {
        vec!["MSFT".into(), "AAPL".into(), "GOOGL".into()]
    }

    #[tokio::test]
    async fn hybrid_puts_static_first() {
        let selector = StockSelector::new(SelectionMode::Hybrid, static_list(), 10, 7);
        let tickers = selector.select(&Movers { available: 20, fail: false }).await;
        assert_eq!(tickers.len(), 10);
        assert_eq!(&tickers[..3], &["MSFT", "AAPL", "GOOGL"]);
        assert_eq!(tickers[3], "G1");
    }

    #[tokio::test]
    async fn hybrid_does_not_deduplicate() {
        struct Overlap;

        #[async_trait]
        impl MarketData for Overlap {
            async fn fetch_daily_series(&self, ticker: &str) -> Result<FetchedBar> {
                Err(AppError::Transport(format!("not used: {ticker}")))
            }

            async fn fetch_market_movers(&self, _: MoverCategory, _: usize) -> Result<Vec<String>> {
                Ok(vec!["MSFT".into()])
            }
        }

        let selector = StockSelector::new(SelectionMode::Hybrid, static_list(), 10, 1);
        let tickers = selector.select(&Overlap).await;
        assert_eq!(tickers, vec!["MSFT", "AAPL", "GOOGL", "MSFT"]);
    }

    #[tokio::test]
    async fn static_returns_list_verbatim() {
        let selector = StockSelector::new(SelectionMode::Static, static_list(), 10, 7);
        let tickers = selector.select(&Movers { available: 20, fail: false }).await;
        assert_eq!(tickers, static_list());
    }

    #[tokio::test]
    async fn dynamic_returns_top_gainers_only() {
        let selector = StockSelector::new(SelectionMode::Dynamic, static_list(), 4, 7);
        let tickers = selector.select(&Movers { available: 20, fail: false }).await;
        assert_eq!(tickers, vec!["G1", "G2", "G3", "G4"]);
    }

    #[tokio::test]
    async fn movers_failure_keeps_static_half() {
        let source = Movers { available: 20, fail: true };

        let hybrid = StockSelector::new(SelectionMode::Hybrid, static_list(), 10, 7);
        assert_eq!(hybrid.select(&source).await, static_list());

        let dynamic = StockSelector::new(SelectionMode::Dynamic, static_list(), 10, 7);
        assert!(dynamic.select(&source).await.is_empty());
    }
}
