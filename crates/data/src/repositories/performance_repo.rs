//! Training performance repository.
//!
//! Every retrain appends a row; readers take the most recent one.

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::models::TrainingPerformanceRecord;

const SELECT_COLUMNS: &str =
    "SELECT model_id, coin, window_name, trained_at, mae, mape, strategy FROM training_performance";

/// Repository for training performance history.
#[derive(Debug, Clone)]
pub struct PerformanceRepository {
    pool: SqlitePool,
}

impl PerformanceRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// # Errors
    /// Returns an error if the database insertion fails.
    pub async fn insert(&self, record: &TrainingPerformanceRecord) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO training_performance
            (model_id, coin, window_name, trained_at, mae, mape, strategy)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(&record.model_id)
        .bind(&record.coin)
        .bind(&record.window)
        .bind(record.trained_at)
        .bind(record.mae)
        .bind(record.mape)
        .bind(&record.strategy)
        .execute(&self.pool)
        .await
        .context("Failed to insert training performance")?;

        Ok(())
    }

    /// Most recent performance row recorded for an artifact.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn latest_for_model(
        &self,
        model_id: &str,
    ) -> Result<Option<TrainingPerformanceRecord>> {
        sqlx::query_as::<_, TrainingPerformanceRecord>(&format!(
            "{SELECT_COLUMNS} WHERE model_id = ?1 ORDER BY trained_at DESC, id DESC LIMIT 1"
        ))
        .bind(model_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to query training performance")
    }

    /// Training history of a coin and window, newest first.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn history(&self, coin: &str, window: &str) -> Result<Vec<TrainingPerformanceRecord>> {
        sqlx::query_as::<_, TrainingPerformanceRecord>(&format!(
            "{SELECT_COLUMNS} WHERE coin = ?1 AND window_name = ?2 ORDER BY trained_at DESC, id DESC"
        ))
        .bind(coin)
        .bind(window)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query training history")
    }
}
