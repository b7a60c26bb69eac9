use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A published forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PredictionRecord {
    pub coin: String,
    #[sqlx(rename = "window_name")]
    pub window: String,
    pub created_at: DateTime<Utc>,
    /// Time of the candle the forecast was made from
    pub actual_time: i64,
    pub actual_close: f64,
    /// Time the forecast refers to
    pub prediction_time: i64,
    pub prediction: f64,
}
