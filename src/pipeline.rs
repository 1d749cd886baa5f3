use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::{InsertOutcome, PriceStore};
use crate::error::{AppError, Result};
use crate::export;
use crate::market_data::{MarketData, MarketDataClient};
use crate::selector::StockSelector;
use crate::types::PriceRecord;
use crate::validator;

/// What happened to one ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerOutcome {
    Inserted,
    AlreadyExists,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub selected: usize,
    pub inserted: usize,
    pub already_exists: usize,
    /// Transport, upstream and malformed-response failures.
    pub fetch_failed: usize,
    pub invalid: usize,
    pub storage_failed: usize,
    /// Every record that passed validation, stored or not.
    pub records: Vec<PriceRecord>,
}

impl RunSummary {
    fn record_error(&mut self, err: &AppError) {
        match err {
            AppError::Validation(_) => self.invalid += 1,
            AppError::Storage(_) => self.storage_failed += 1,
            _ => self.fetch_failed += 1,
        }
    }

    pub fn skipped(&self) -> usize {
        self.fetch_failed + self.invalid + self.storage_failed
    }
}

/// Runs selection, then fetch → validate → store for each ticker in order.
pub struct PipelineRunner<'a> {
    source: &'a dyn MarketData,
    store: &'a PriceStore,
    selector: StockSelector,
}

impl<'a> PipelineRunner<'a> {
    pub fn new(source: &'a dyn MarketData, store: &'a PriceStore, selector: StockSelector) -> Self {
        Self { source, store, selector }
    }

    /// A failed ticker never stops the ones after it; partial success is a
    /// normal result.
    pub async fn run(&self) -> RunSummary {
        let tickers = self.selector.select(self.source).await;
        let mut summary = RunSummary {
            selected: tickers.len(),
            ..RunSummary::default()
        };

        for ticker in &tickers {
            match self.process_ticker(ticker, &mut summary).await {
                Ok(TickerOutcome::Inserted) => summary.inserted += 1,
                Ok(TickerOutcome::AlreadyExists) => summary.already_exists += 1,
                Err(e) => {
                    warn!(ticker = %ticker, kind = e.kind(), "Skipping ticker: {e}");
                    summary.record_error(&e);
                }
            }
        }

        summary
    }

    async fn process_ticker(&self, ticker: &str, summary: &mut RunSummary) -> Result<TickerOutcome> {
        let bar = self.source.fetch_daily_series(ticker).await?;
        let record = validator::validate(&bar)?;
        summary.records.push(record.clone());

        if self.store.exists(&record.ticker, record.trade_date).await? {
            info!(
                ticker = %ticker,
                trade_date = %record.trade_date,
                "Entry already exists"
            );
            return Ok(TickerOutcome::AlreadyExists);
        }

        match self.store.insert(&record).await? {
            InsertOutcome::Inserted => Ok(TickerOutcome::Inserted),
            InsertOutcome::AlreadyExists => {
                info!(
                    ticker = %ticker,
                    trade_date = %record.trade_date,
                    "Entry already exists (written concurrently)"
                );
                Ok(TickerOutcome::AlreadyExists)
            }
        }
    }
}

/// One scheduled run: check configuration, open the store, process tickers,
/// export, close. Only configuration and store-preparation errors are returned.
pub async fn run_once(cfg: &Config) -> Result<RunSummary> {
    cfg.check()?;

    let client = MarketDataClient::new(cfg)?;
    let store = PriceStore::connect(cfg.database_url()?).await?;

    if let Err(e) = store.migrate().await {
        store.close().await;
        return Err(e);
    }

    let runner = PipelineRunner::new(&client, &store, StockSelector::from_config(cfg));
    let summary = runner.run().await;
    store.close().await;

    if let Some(path) = &cfg.csv_export_path {
        match export::export_to_path(path, &summary.records) {
            Ok(()) => info!("Exported {} records to {}", summary.records.len(), path.display()),
            Err(e) => error!("CSV export to {} failed: {e}", path.display()),
        }
    }

    info!(
        event = "RUN_SUMMARY",
        selected = summary.selected,
        inserted = summary.inserted,
        already_exists = summary.already_exists,
        fetch_failed = summary.fetch_failed,
        invalid = summary.invalid,
        storage_failed = summary.storage_failed,
        "Run complete | selected: {} | inserted: {} | already exists: {} | skipped: {}",
        summary.selected,
        summary.inserted,
        summary.already_exists,
        summary.skipped(),
    );

    Ok(summary)
}
