use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::types::PriceRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The key was already present, possibly written by an overlapping run.
    AlreadyExists,
}

/// Append-only store of daily bars keyed by (ticker, trade_date).
#[derive(Clone)]
pub struct PriceStore {
    pool: SqlitePool,
}

impl PriceStore {
    /// Open a single-connection pool. The run is sequential, and an
    /// in-memory database only lives as long as its one connection.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn exists(&self, ticker: &str, trade_date: NaiveDate) -> Result<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM stock_prices WHERE ticker = ? AND trade_date = ?")
                .bind(ticker)
                .bind(trade_date)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }

    /// Insert-if-absent as one statement inside its own transaction.
    /// Any failure rolls the transaction back, so no partial row is visible.
    pub async fn insert(&self, record: &PriceRecord) -> Result<InsertOutcome> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO stock_prices (
                ticker, trade_date, open_price, high_price, low_price, close_price, volume, inserted_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (ticker, trade_date) DO NOTHING
            "#,
        )
        .bind(&record.ticker)
        .bind(record.trade_date)
        .bind(record.open)
        .bind(record.high)
        .bind(record.low)
        .bind(record.close)
        .bind(record.volume)
        .bind(Utc::now().timestamp())
        .execute(&mut *tx)
        .await;

        match result {
            Ok(done) => {
                tx.commit().await?;
                if done.rows_affected() == 0 {
                    Ok(InsertOutcome::AlreadyExists)
                } else {
                    info!(
                        ticker = %record.ticker,
                        trade_date = %record.trade_date,
                        "Inserted row"
                    );
                    Ok(InsertOutcome::Inserted)
                }
            }
            Err(e) => {
                if let Err(rb) = tx.rollback().await {
                    warn!(ticker = %record.ticker, "Rollback failed: {rb}");
                }
                let err = AppError::from(e);
                if err.is_unique_violation() {
                    Ok(InsertOutcome::AlreadyExists)
                } else {
                    Err(err)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> PriceStore {
        let store = PriceStore::connect("sqlite::memory:").await.unwrap();
        store.migrate().await.unwrap();
        store
    }

    fn record(ticker: &str, day: u32) -> PriceRecord {
        PriceRecord {
            ticker: ticker.to_string(),
            trade_date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            open: 410.0,
            high: 410.45,
            low: 404.5,
            close: 406.22,
            volume: 21_035_477,
        }
    }

    async fn row_count(store: &PriceStore) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM stock_prices")
            .fetch_one(&store.pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn insert_then_exists() {
        let store = memory_store().await;
        let r = record("MSFT", 8);
        assert!(!store.exists(&r.ticker, r.trade_date).await.unwrap());

        assert_eq!(store.insert(&r).await.unwrap(), InsertOutcome::Inserted);
        assert!(store.exists(&r.ticker, r.trade_date).await.unwrap());
    }

    #[tokio::test]
    async fn second_insert_is_already_exists() {
        let store = memory_store().await;
        let r = record("MSFT", 8);
        assert_eq!(store.insert(&r).await.unwrap(), InsertOutcome::Inserted);

        let mut changed = r.clone();
        changed.close = 1.0;
        assert_eq!(store.insert(&changed).await.unwrap(), InsertOutcome::AlreadyExists);
        assert_eq!(row_count(&store).await, 1);

        let close: f64 = sqlx::query_scalar("SELECT close_price FROM stock_prices WHERE ticker = 'MSFT'")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(close, 406.22);
    }

    #[tokio::test]
    async fn key_is_ticker_and_date() {
        let store = memory_store().await;
        store.insert(&record("MSFT", 7)).await.unwrap();
        store.insert(&record("MSFT", 8)).await.unwrap();
        store.insert(&record("AAPL", 8)).await.unwrap();
        assert_eq!(row_count(&store).await, 3);
        assert!(!store.exists("AAPL", NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()).await.unwrap());
    }

    #[tokio::test]
    async fn failed_insert_leaves_no_row() {
        let store = memory_store().await;
        sqlx::query("DROP TABLE stock_prices")
            .execute(&store.pool)
            .await
            .unwrap();

        let err = store.insert(&record("MSFT", 8)).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert!(store.exists("MSFT", NaiveDate::from_ymd_opt(2024, 3, 8).unwrap()).await.is_err());
    }
}
