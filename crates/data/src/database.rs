use std::future::Future;
use std::str::FromStr;

use anyhow::{Context, Result};
use coin_forecast_core::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::repositories::Repositories;

/// `SQLite` row store shared by all pipeline stages.
///
/// Cloning is cheap; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Opens (creating if needed) the database and applies migrations.
    ///
    /// # Errors
    ///
    /// Returns error if the URL is invalid, connection fails or migrations fail.
    pub async fn open(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .with_context(|| format!("Invalid database url: {}", config.url))?
            .create_if_missing(true);

        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database {}", config.url))?;

        Self::from_pool(pool).await
    }

    /// Creates an in-memory database.
    ///
    /// Every connection to `sqlite::memory:` sees its own database, so the
    /// pool is pinned to one connection that is never recycled.
    ///
    /// # Errors
    ///
    /// Returns error if connection fails.
    pub async fn new_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self { pool })
    }

    /// Opens the store, runs `f` with it and closes the pool whatever `f` returns.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be opened, or the error of `f`.
    pub async fn scoped<T, F, Fut>(config: &DatabaseConfig, f: F) -> Result<T>
    where
        F: FnOnce(Store) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        Self::open(config).await?.run_scoped(f).await
    }

    /// Runs `f` with a handle to this store, then closes the pool.
    ///
    /// # Errors
    ///
    /// Returns the error of `f`.
    pub async fn run_scoped<T, F, Fut>(self, f: F) -> Result<T>
    where
        F: FnOnce(Store) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let result = f(self.clone()).await;
        self.close().await;
        result
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    #[must_use]
    pub fn repositories(&self) -> Repositories {
        Repositories::new(self.pool.clone())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}
