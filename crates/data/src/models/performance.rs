//! Training performance history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scores of one training run of a coin and window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TrainingPerformanceRecord {
    pub model_id: String,
    pub coin: String,
    #[sqlx(rename = "window_name")]
    pub window: String,
    pub trained_at: DateTime<Utc>,
    pub mae: f64,
    pub mape: f64,
    /// Winning ensemble, e.g. "random_forest+linear"
    pub strategy: String,
}
