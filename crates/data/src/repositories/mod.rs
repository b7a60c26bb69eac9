//! Database repositories of the forecaster's row store.
//!
//! Each repository provides typed access to one table.

pub mod auxiliary_repo;
pub mod candle_repo;
pub mod manifest_repo;
pub mod performance_repo;
pub mod prediction_repo;

pub use auxiliary_repo::AuxiliaryRepository;
pub use candle_repo::CandleRepository;
pub use manifest_repo::ManifestRepository;
pub use performance_repo::PerformanceRepository;
pub use prediction_repo::PredictionRepository;

use sqlx::SqlitePool;

/// Creates all repositories from a single database pool.
#[derive(Debug, Clone)]
pub struct Repositories {
    pub candles: CandleRepository,
    pub auxiliary: AuxiliaryRepository,
    pub performance: PerformanceRepository,
    pub predictions: PredictionRepository,
    pub manifest: ManifestRepository,
}

impl Repositories {
    /// Creates a new set of repositories from a database pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            candles: CandleRepository::new(pool.clone()),
            auxiliary: AuxiliaryRepository::new(pool.clone()),
            performance: PerformanceRepository::new(pool.clone()),
            predictions: PredictionRepository::new(pool.clone()),
            manifest: ManifestRepository::new(pool),
        }
    }
}
