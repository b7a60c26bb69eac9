//! Auxiliary daily series repository.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use coin_forecast_core::AuxPoint;
use sqlx::SqlitePool;

/// Repository for daily auxiliary series (one value per series per day).
#[derive(Debug, Clone)]
pub struct AuxiliaryRepository {
    pool: SqlitePool,
}

impl AuxiliaryRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts or overwrites the values of `series` for the given days.
    ///
    /// # Returns
    /// The number of rows written.
    ///
    /// # Errors
    /// Returns an error if the database transaction fails.
    pub async fn upsert_batch(&self, series: &str, points: &[AuxPoint]) -> Result<u64> {
        if points.is_empty() {
            return Ok(0);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        let mut written = 0u64;

        for point in points {
            let result = sqlx::query(
                r"
                INSERT INTO auxiliary_series (series, day, value)
                VALUES (?1, ?2, ?3)
                ON CONFLICT (series, day) DO UPDATE SET value = excluded.value
                ",
            )
            .bind(series)
            .bind(point.day)
            .bind(point.value)
            .execute(&mut *tx)
            .await
            .context("Failed to upsert auxiliary value")?;

            written += result.rows_affected();
        }

        tx.commit().await.context("Failed to commit transaction")?;
        Ok(written)
    }

    /// Returns every value of `series`, oldest day first.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn series(&self, series: &str) -> Result<Vec<AuxPoint>> {
        let rows: Vec<(NaiveDate, f64)> = sqlx::query_as(
            "SELECT day, value FROM auxiliary_series WHERE series = ?1 ORDER BY day ASC",
        )
        .bind(series)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to query auxiliary series {series}"))?;

        Ok(rows
            .into_iter()
            .map(|(day, value)| AuxPoint { day, value })
            .collect())
    }
}
