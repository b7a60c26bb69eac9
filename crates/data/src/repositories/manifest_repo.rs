//! Model manifest repository: one row per coin and window naming the
//! current artifact.

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::models::ManifestRecord;

/// Repository for the current-model manifest.
#[derive(Debug, Clone)]
pub struct ManifestRepository {
    pool: SqlitePool,
}

impl ManifestRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Points the coin and window at a new artifact.
    ///
    /// # Errors
    /// Returns an error if the database write fails.
    pub async fn replace(&self, record: &ManifestRecord) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO model_manifest (coin, window_name, model_id, mae, mape, created_at, path)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT (coin, window_name) DO UPDATE SET
                model_id = excluded.model_id,
                mae = excluded.mae,
                mape = excluded.mape,
                created_at = excluded.created_at,
                path = excluded.path
            ",
        )
        .bind(&record.coin)
        .bind(&record.window)
        .bind(&record.model_id)
        .bind(record.mae)
        .bind(record.mape)
        .bind(record.created_at)
        .bind(&record.path)
        .execute(&self.pool)
        .await
        .context("Failed to replace manifest row")?;

        Ok(())
    }

    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn current(&self, coin: &str, window: &str) -> Result<Option<ManifestRecord>> {
        sqlx::query_as::<_, ManifestRecord>(
            r"
            SELECT model_id, coin, window_name, mae, mape, created_at, path
            FROM model_manifest
            WHERE coin = ?1 AND window_name = ?2
            ",
        )
        .bind(coin)
        .bind(window)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to query manifest")
    }
}
