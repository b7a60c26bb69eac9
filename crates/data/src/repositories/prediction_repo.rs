//! Prediction repository.

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::models::PredictionRecord;

/// Repository for published predictions.
#[derive(Debug, Clone)]
pub struct PredictionRepository {
    pool: SqlitePool,
}

impl PredictionRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// # Errors
    /// Returns an error if the database insertion fails.
    pub async fn insert(&self, record: &PredictionRecord) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO predictions
            (coin, window_name, created_at, actual_time, actual_close, prediction_time, prediction)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(&record.coin)
        .bind(&record.window)
        .bind(record.created_at)
        .bind(record.actual_time)
        .bind(record.actual_close)
        .bind(record.prediction_time)
        .bind(record.prediction)
        .execute(&self.pool)
        .await
        .context("Failed to insert prediction")?;

        Ok(())
    }

    /// Predictions of a coin and window whose target time is at or after
    /// `from_time`, ordered by target time.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn since(
        &self,
        coin: &str,
        window: &str,
        from_time: i64,
    ) -> Result<Vec<PredictionRecord>> {
        sqlx::query_as::<_, PredictionRecord>(
            r"
            SELECT coin, window_name, created_at, actual_time, actual_close, prediction_time, prediction
            FROM predictions
            WHERE coin = ?1 AND window_name = ?2 AND prediction_time >= ?3
            ORDER BY prediction_time ASC, id ASC
            ",
        )
        .bind(coin)
        .bind(window)
        .bind(from_time)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query predictions")
    }
}
