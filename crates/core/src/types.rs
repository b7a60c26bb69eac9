use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV sample of a coin, keyed by its opening unix timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub coin: String,
    pub time: i64,
    pub low: f64,
    pub high: f64,
    pub open: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// UTC calendar day the candle belongs to.
    #[must_use]
    pub fn day(&self) -> NaiveDate {
        day_of(self.time)
    }
}

/// One daily value of an auxiliary series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AuxPoint {
    pub day: NaiveDate,
    pub value: f64,
}

/// UTC calendar day of a unix timestamp.
#[must_use]
pub fn day_of(time: i64) -> NaiveDate {
    DateTime::<Utc>::from_timestamp(time, 0)
        .map(|dt| dt.date_naive())
        .unwrap_or_default()
}

/// Unix timestamp of midnight UTC on `day`.
#[must_use]
pub fn day_start(day: NaiveDate) -> i64 {
    day.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}
