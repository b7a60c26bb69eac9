//! Candle repository.
//!
//! Stores five-minute candles per coin. A UTC day is the unit of correction:
//! it is replaced as a whole (delete then insert) inside one transaction.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use coin_forecast_core::{day_of, day_start, AuxPoint, Candle};
use sqlx::SqlitePool;

use crate::models::{CandleRecord, DayCount, DayReport};

const SECONDS_PER_DAY: i64 = 86_400;

/// Repository for candle operations.
#[derive(Debug, Clone)]
pub struct CandleRepository {
    pool: SqlitePool,
}

impl CandleRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Replaces every stored candle of `coin` on `day` with `candles`.
    ///
    /// Candles outside the day are ignored and repeated timestamps are kept
    /// once. Nothing is written unless the whole day commits.
    ///
    /// # Returns
    /// The number of candles inserted.
    ///
    /// # Errors
    /// Returns an error if the database transaction fails.
    pub async fn replace_day(&self, coin: &str, day: NaiveDate, candles: &[Candle]) -> Result<u64> {
        let start = day_start(day);
        let end = start + SECONDS_PER_DAY;

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        sqlx::query("DELETE FROM candles WHERE coin = ?1 AND time >= ?2 AND time < ?3")
            .bind(coin)
            .bind(start)
            .bind(end)
            .execute(&mut *tx)
            .await
            .context("Failed to delete candles of day")?;

        let mut inserted = 0u64;
        for candle in candles.iter().filter(|c| c.time >= start && c.time < end) {
            let result = sqlx::query(
                r"
                INSERT INTO candles (coin, time, low, high, open, close, volume)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT (coin, time) DO NOTHING
                ",
            )
            .bind(coin)
            .bind(candle.time)
            .bind(candle.low)
            .bind(candle.high)
            .bind(candle.open)
            .bind(candle.close)
            .bind(candle.volume)
            .execute(&mut *tx)
            .await
            .context("Failed to insert candle")?;

            inserted += result.rows_affected();
        }

        tx.commit().await.context("Failed to commit transaction")?;
        Ok(inserted)
    }

    /// Counts stored candles and distinct timestamps per UTC day.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn day_report(&self, coin: &str) -> Result<DayReport> {
        let rows: Vec<(i64, i64, i64)> = sqlx::query_as(
            r"
            SELECT time / 86400 AS day_index, COUNT(*), COUNT(DISTINCT time)
            FROM candles
            WHERE coin = ?1
            GROUP BY day_index
            ",
        )
        .bind(coin)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query day counts")?;

        let days: BTreeMap<_, _> = rows
            .into_iter()
            .map(|(day_index, candles, distinct_times)| {
                (
                    day_of(day_index * SECONDS_PER_DAY),
                    DayCount {
                        candles,
                        distinct_times,
                    },
                )
            })
            .collect();

        Ok(DayReport::new(days))
    }

    /// Returns the full candle history of a coin, oldest first.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn query_by_coin(&self, coin: &str) -> Result<Vec<Candle>> {
        self.query_since(coin, i64::MIN).await
    }

    /// Returns candles of a coin at or after `from_time`, oldest first.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn query_since(&self, coin: &str, from_time: i64) -> Result<Vec<Candle>> {
        let records = sqlx::query_as::<_, CandleRecord>(
            r"
            SELECT coin, time, low, high, open, close, volume
            FROM candles
            WHERE coin = ?1 AND time >= ?2
            ORDER BY time ASC
            ",
        )
        .bind(coin)
        .bind(from_time)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query candles")?;

        Ok(records.into_iter().map(Candle::from).collect())
    }

    /// Daily maximum close of a coin, used as a reference-coin series.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn daily_max_close(&self, coin: &str) -> Result<Vec<AuxPoint>> {
        let rows: Vec<(i64, f64)> = sqlx::query_as(
            r"
            SELECT time / 86400 AS day_index, MAX(close)
            FROM candles
            WHERE coin = ?1
            GROUP BY day_index
            ORDER BY day_index ASC
            ",
        )
        .bind(coin)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query daily max close")?;

        Ok(rows
            .into_iter()
            .map(|(day_index, value)| AuxPoint {
                day: day_of(day_index * SECONDS_PER_DAY),
                value,
            })
            .collect())
    }

    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn count(&self, coin: &str) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM candles WHERE coin = ?1")
            .bind(coin)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count candles")?;

        Ok(row.0)
    }
}
