//! Candle rows and the per-day completeness report used by ingestion.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use coin_forecast_core::Candle;
use serde::{Deserialize, Serialize};

/// A stored OHLCV candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CandleRecord {
    pub coin: String,
    /// Opening time, unix seconds
    pub time: i64,
    pub low: f64,
    pub high: f64,
    pub open: f64,
    pub close: f64,
    pub volume: f64,
}

impl From<CandleRecord> for Candle {
    fn from(r: CandleRecord) -> Self {
        Self {
            coin: r.coin,
            time: r.time,
            low: r.low,
            high: r.high,
            open: r.open,
            close: r.close,
            volume: r.volume,
        }
    }
}

/// Stored candle count of one UTC day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DayCount {
    pub candles: i64,
    pub distinct_times: i64,
}

impl DayCount {
    #[must_use]
    pub fn duplicates(&self) -> i64 {
        self.candles - self.distinct_times
    }
}

/// Candle counts of every stored day of a coin.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayReport {
    days: BTreeMap<NaiveDate, DayCount>,
}

impl DayReport {
    #[must_use]
    pub fn new(days: BTreeMap<NaiveDate, DayCount>) -> Self {
        Self { days }
    }

    #[must_use]
    pub fn get(&self, day: NaiveDate) -> Option<DayCount> {
        self.days.get(&day).copied()
    }

    /// Whether the stored day is complete enough to skip refetching:
    /// its count lies in `[min, max]` and no timestamp repeats.
    #[must_use]
    pub fn is_acceptable(&self, day: NaiveDate, min: i64, max: i64) -> bool {
        self.get(day).is_some_and(|count| {
            (min..=max).contains(&count.candles) && count.duplicates() == 0
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.days.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}
