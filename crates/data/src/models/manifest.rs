use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pointer to the current model artifact of a coin and window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ManifestRecord {
    pub model_id: String,
    pub coin: String,
    #[sqlx(rename = "window_name")]
    pub window: String,
    pub mae: f64,
    pub mape: f64,
    pub created_at: DateTime<Utc>,
    pub path: String,
}
