//! JSON snapshots read by the dashboard.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

pub const LATEST_FILE: &str = "latest.json";
pub const CHARTS_FILE: &str = "charts.json";

/// Decimal places of published prices and changes.
pub const PRICE_DP: u32 = 8;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The most recent forecast of a coin and window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestSnapshot {
    /// Time the forecast refers to
    pub predict_time: String,
    /// Time of the candle the forecast was made from
    pub predict_now: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub predict_close: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub prediction: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub expected_change: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub expected_change_pct: Decimal,
    pub change_direction: String,
    pub stats_training_time: String,
    pub stats_mae: f64,
    #[serde(with = "crate::metrics::unbounded")]
    pub stats_mape: f64,
}

/// Forward price and change derived from a close and a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceChange {
    pub close: Decimal,
    pub prediction: Decimal,
    pub change: Decimal,
    pub change_pct: Decimal,
}

impl PriceChange {
    /// Rounds both prices to eight places and derives the change from the
    /// rounded values.
    ///
    /// # Errors
    /// Returns `ModelError::NonFinite` if either value is not a finite number.
    pub fn new(close: f64, prediction: f64) -> Result<Self, ModelError> {
        let close = to_decimal(close, "close")?;
        let prediction = to_decimal(prediction, "prediction")?;
        let change = (prediction - close).round_dp(PRICE_DP);
        let change_pct = if close.is_zero() {
            Decimal::ZERO
        } else {
            (prediction / close - Decimal::ONE).round_dp(PRICE_DP)
        };
        Ok(Self {
            close,
            prediction,
            change,
            change_pct,
        })
    }

    /// `"up"` for a positive change, `"down"` otherwise.
    #[must_use]
    pub fn direction(&self) -> &'static str {
        if self.change > Decimal::ZERO {
            "up"
        } else {
            "down"
        }
    }
}

fn to_decimal(value: f64, what: &str) -> Result<Decimal, ModelError> {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(PRICE_DP))
        .ok_or_else(|| ModelError::NonFinite(what.to_string()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActualPoint {
    pub time: i64,
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionPoint {
    pub time: i64,
    pub prediction: f64,
}

/// Recent actual closes and forecasts for the performance chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartsSnapshot {
    pub actuals: Vec<ActualPoint>,
    pub predictions: Vec<PredictionPoint>,
}

impl ChartsSnapshot {
    /// Builds the chart from points sorted by time. Actuals before the first
    /// forecast are dropped.
    #[must_use]
    pub fn new(actuals: Vec<ActualPoint>, predictions: Vec<PredictionPoint>) -> Self {
        let actuals = match predictions.first() {
            Some(first) => actuals.into_iter().filter(|a| a.time >= first.time).collect(),
            None => Vec::new(),
        };
        Self {
            actuals,
            predictions,
        }
    }
}

/// `YYYY-MM-DD HH:MM:SS` in UTC.
#[must_use]
pub fn format_unix(time: i64) -> String {
    DateTime::<Utc>::from_timestamp(time, 0)
        .map(|t| t.format(TIME_FORMAT).to_string())
        .unwrap_or_default()
}

#[must_use]
pub fn format_datetime(time: &DateTime<Utc>) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Replaces `file` in `dir` with the JSON form of `value`.
///
/// # Errors
/// Returns an error if the directory or file cannot be written.
pub fn write_json<T: Serialize>(dir: &Path, file: &str, value: &T) -> Result<PathBuf, ModelError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(file);
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
    fs::rename(&tmp, &path)?;
    Ok(path)
}
