//! Row store of the coin price forecaster.
//!
//! This crate provides:
//! - `SQLite` store with embedded migrations and scoped sessions
//! - Data models for candles, predictions, and training bookkeeping
//! - Repositories for typed database access
//! - CSV import of daily reference-index series

pub mod csv_storage;
pub mod database;
pub mod models;
pub mod repositories;

pub use csv_storage::{CsvStorage, ImportStats, IndexRow};
pub use database::Store;

pub use models::{
    CandleRecord, DayCount, DayReport, ManifestRecord, PredictionRecord,
    TrainingPerformanceRecord,
};

pub use repositories::{
    AuxiliaryRepository, CandleRepository, ManifestRepository, PerformanceRepository,
    PredictionRepository, Repositories,
};
