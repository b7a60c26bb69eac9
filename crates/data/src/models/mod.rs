//! Row types of the forecaster's store.
//!
//! Models derive `sqlx::FromRow` for database compatibility. Times of market
//! data are unix seconds; bookkeeping timestamps are `DateTime<Utc>`.

pub mod candle;
pub mod manifest;
pub mod performance;
pub mod prediction;

pub use candle::{CandleRecord, DayCount, DayReport};
pub use manifest::ManifestRecord;
pub use performance::TrainingPerformanceRecord;
pub use prediction::PredictionRecord;
