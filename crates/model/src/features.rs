//! Feature frame construction.
//!
//! Turns the candle history of a coin into a `f32` feature matrix: the raw
//! OHLCV columns, rolling means of close (and optionally volume), and daily
//! auxiliary series joined on the latest day at or before each candle's day.
//! The target of row `i` is `close[i + horizon]`.

use anyhow::Result;
use coin_forecast_core::{AuxPoint, Candle, FeatureConfig, PipelineError};
use coin_forecast_data::Repositories;
use ndarray::{Array1, Array2};

use crate::dataset::Dataset;
use crate::error::ModelError;

pub const BASE_COLUMNS: [&str; 5] = ["low", "high", "open", "close", "volume"];
pub const MA_CLOSE_PREFIX: &str = "ma_close_";

/// Which columns to build and how far ahead the target lies.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSpec {
    pub ma_windows: Vec<usize>,
    pub volume_averages: bool,
    pub horizon: usize,
}

impl FeatureSpec {
    /// # Errors
    /// Returns `PipelineError::InvalidConfig` if the moving-average range is empty.
    pub fn from_config(config: &FeatureConfig, horizon: usize) -> Result<Self, PipelineError> {
        let ma_windows = config.ma_windows();
        if ma_windows.is_empty() {
            return Err(PipelineError::InvalidConfig(format!(
                "moving-average range ({}, {}, {}) yields no windows",
                config.ma_min, config.ma_max, config.ma_step
            )));
        }
        Ok(Self {
            ma_windows,
            volume_averages: config.volume_averages,
            horizon,
        })
    }
}

/// A named daily series to join onto the candles.
#[derive(Debug, Clone, PartialEq)]
pub struct AuxSeries {
    pub column: String,
    /// Sorted by day
    pub points: Vec<AuxPoint>,
}

/// Feature matrix over the full candle history, oldest row first.
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    pub coin: String,
    pub names: Vec<String>,
    pub times: Vec<i64>,
    pub closes: Vec<f64>,
    pub values: Array2<f32>,
    pub horizon: usize,
}

impl FeatureFrame {
    /// Builds the frame from candles (any order) and auxiliary series.
    ///
    /// # Errors
    /// Returns `PipelineError::NoCandles` if `candles` is empty.
    pub fn build(
        coin: &str,
        candles: &[Candle],
        aux: &[AuxSeries],
        spec: &FeatureSpec,
    ) -> Result<Self, PipelineError> {
        if candles.is_empty() {
            return Err(PipelineError::NoCandles {
                coin: coin.to_string(),
            });
        }

        let mut sorted: Vec<&Candle> = candles.iter().collect();
        sorted.sort_by_key(|c| c.time);
        let n = sorted.len();

        let close: Vec<f64> = sorted.iter().map(|c| c.close).collect();
        let volume: Vec<f64> = sorted.iter().map(|c| c.volume).collect();

        let mut names: Vec<String> = BASE_COLUMNS.iter().map(|s| (*s).to_string()).collect();
        let mut columns: Vec<Vec<f64>> = vec![
            sorted.iter().map(|c| c.low).collect(),
            sorted.iter().map(|c| c.high).collect(),
            sorted.iter().map(|c| c.open).collect(),
            close.clone(),
            volume.clone(),
        ];

        for &window in &spec.ma_windows {
            names.push(format!("{MA_CLOSE_PREFIX}{window}"));
            columns.push(rolling_mean(&close, window));
        }
        if spec.volume_averages {
            for &window in &spec.ma_windows {
                names.push(format!("ma_volume_{window}"));
                columns.push(rolling_mean(&volume, window));
            }
        }

        let days: Vec<_> = sorted.iter().map(|c| c.day()).collect();
        for series in aux {
            names.push(series.column.clone());
            columns.push(join_daily(&days, &series.points));
        }

        let values = Array2::from_shape_fn((n, columns.len()), |(i, j)| {
            let v = columns[j][i];
            // fillna(0)
            if v.is_finite() {
                v as f32
            } else {
                0.0
            }
        });

        Ok(Self {
            coin: coin.to_string(),
            names,
            times: sorted.iter().map(|c| c.time).collect(),
            closes: close,
            values,
            horizon: spec.horizon,
        })
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    /// Rows that have a target, with `target[i] = close[i + horizon]`.
    ///
    /// # Errors
    /// Returns `ModelError::EmptyDataset` when the history is not longer than the horizon.
    pub fn training_dataset(&self) -> Result<Dataset, ModelError> {
        let n = self.n_rows();
        if n <= self.horizon {
            return Err(ModelError::EmptyDataset);
        }
        let rows = n - self.horizon;

        let features = self.values.slice(ndarray::s![..rows, ..]).to_owned();
        let targets = Array1::from_iter(
            self.closes[self.horizon..]
                .iter()
                .map(|&c| if c.is_finite() { c as f32 } else { 0.0 }),
        );
        Dataset::new(
            self.names.clone(),
            features,
            targets,
            self.times[..rows].to_vec(),
        )
    }

    /// The most recent row: its time, close and features.
    #[must_use]
    pub fn last_row(&self) -> Option<(i64, f64, ndarray::ArrayView1<'_, f32>)> {
        let last = self.n_rows().checked_sub(1)?;
        Some((self.times[last], self.closes[last], self.values.row(last)))
    }
}

/// Mean over `[max(0, i - window + 1), i]` for every `i`.
#[must_use]
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for i in 0..values.len() {
        sum += values[i];
        if i >= window {
            sum -= values[i - window];
        }
        let len = (i + 1).min(window);
        out.push(sum / len as f64);
    }
    out
}

/// For each day, the value of the latest point on or before it (0 if none).
/// `days` and `points` must be sorted ascending.
fn join_daily(days: &[chrono::NaiveDate], points: &[AuxPoint]) -> Vec<f64> {
    let mut out = Vec::with_capacity(days.len());
    let mut next = 0;
    let mut current = 0.0;
    for day in days {
        while next < points.len() && points[next].day <= *day {
            current = points[next].value;
            next += 1;
        }
        out.push(current);
    }
    out
}

/// Column name of an auxiliary series.
#[must_use]
pub fn aux_column(series: &str) -> String {
    format!("aux_{series}")
}

/// Column name of the reference-coin series.
#[must_use]
pub fn reference_column(coin: &str) -> String {
    format!("aux_ref_{coin}")
}

/// Loads the candles and auxiliary series of `coin` and builds its frame.
///
/// # Errors
/// Returns `PipelineError::NoCandles` if the coin has no candles, or a database error.
pub async fn load_frame(
    repos: &Repositories,
    coin: &str,
    config: &FeatureConfig,
    horizon: usize,
) -> Result<FeatureFrame> {
    let spec = FeatureSpec::from_config(config, horizon)?;
    let candles = repos.candles.query_by_coin(coin).await?;

    let mut aux = Vec::with_capacity(config.auxiliary_series.len() + 1);
    for series in &config.auxiliary_series {
        aux.push(AuxSeries {
            column: aux_column(series),
            points: repos.auxiliary.series(series).await?,
        });
    }
    if let Some(reference) = &config.reference_coin {
        aux.push(AuxSeries {
            column: reference_column(reference),
            points: repos.candles.daily_max_close(reference).await?,
        });
    }

    let frame = FeatureFrame::build(coin, &candles, &aux, &spec)?;
    tracing::debug!(
        coin,
        rows = frame.n_rows(),
        columns = frame.names.len(),
        "Built feature frame"
    );
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use coin_forecast_core::day_start;

    fn candles(n: usize) -> Vec<Candle> {
        let start = day_start(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        (0..n)
            .map(|i| Candle {
                coin: "BTC-USD".to_string(),
                time: start + i as i64 * 300,
                low: i as f64,
                high: i as f64 + 2.0,
                open: i as f64 + 0.5,
                close: i as f64 + 1.0,
                volume: 10.0,
            })
            .collect()
    }

    fn spec(horizon: usize) -> FeatureSpec {
        FeatureSpec {
            ma_windows: vec![10, 20, 30, 40],
            volume_averages: false,
            horizon,
        }
    }

    #[test]
    fn test_rolling_mean_expanding_then_windowed() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let means = rolling_mean(&values, 3);
        assert_eq!(means, vec![1.0, 1.5, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_rolling_mean_matches_naive_definition() {
        let values: Vec<f64> = (0..50).map(|i| ((i * 37) % 11) as f64).collect();
        let window = 7;
        let means = rolling_mean(&values, window);
        for i in 0..values.len() {
            let lo = (i + 1).saturating_sub(window);
            let slice = &values[lo..=i];
            let expected = slice.iter().sum::<f64>() / slice.len() as f64;
            assert!((means[i] - expected).abs() < 1e-9, "row {i}");
        }
    }

    #[test]
    fn test_join_daily_uses_latest_preceding_day() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        let points = vec![
            AuxPoint { day: day(2), value: 5.0 },
            AuxPoint { day: day(4), value: 7.0 },
        ];
        let days = vec![day(1), day(2), day(3), day(4), day(6)];
        assert_eq!(join_daily(&days, &points), vec![0.0, 5.0, 5.0, 7.0, 7.0]);
    }

    #[test]
    fn test_frame_columns_in_order() {
        let aux = vec![
            AuxSeries {
                column: aux_column("spy_close"),
                points: vec![],
            },
            AuxSeries {
                column: reference_column("BTC-USD"),
                points: vec![],
            },
        ];
        let spec = FeatureSpec {
            volume_averages: true,
            ..spec(1)
        };
        let frame = FeatureFrame::build("ETH-USD", &candles(5), &aux, &spec).unwrap();

        assert_eq!(
            frame.names,
            vec![
                "low", "high", "open", "close", "volume",
                "ma_close_10", "ma_close_20", "ma_close_30", "ma_close_40",
                "ma_volume_10", "ma_volume_20", "ma_volume_30", "ma_volume_40",
                "aux_spy_close", "aux_ref_BTC-USD",
            ]
        );
        // missing auxiliary values are zero
        assert!(frame.values.column(13).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_frame_sorts_candles() {
        let mut input = candles(4);
        input.reverse();
        let frame = FeatureFrame::build("BTC-USD", &input, &[], &spec(1)).unwrap();
        assert!(frame.times.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(frame.closes, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_training_rows_and_targets() {
        let frame = FeatureFrame::build("BTC-USD", &candles(10), &[], &spec(3)).unwrap();
        let data = frame.training_dataset().unwrap();

        assert_eq!(data.n_samples(), 7);
        // target is close three rows ahead
        assert_eq!(data.targets[0], 4.0);
        assert_eq!(data.targets[6], 10.0);
        assert_eq!(frame.last_row().unwrap().1, 10.0);
    }

    #[test]
    fn test_history_shorter_than_horizon_is_empty() {
        let frame = FeatureFrame::build("BTC-USD", &candles(3), &[], &spec(3)).unwrap();
        assert!(matches!(frame.training_dataset(), Err(ModelError::EmptyDataset)));
        assert!(frame.last_row().is_some());
    }

    #[test]
    fn test_four_hundred_days_of_candles() {
        let n = 400 * 288;
        let frame = FeatureFrame::build("BTC-USD", &candles(n), &[], &spec(288)).unwrap();
        let data = frame.training_dataset().unwrap();

        let ma_columns = frame
            .names
            .iter()
            .filter(|n| n.starts_with(MA_CLOSE_PREFIX))
            .count();
        assert_eq!(ma_columns, 4);
        assert_eq!(data.n_samples(), n - 288);
        assert_eq!(frame.n_rows(), n);
    }

    #[test]
    fn test_no_candles_is_fatal() {
        let err = FeatureFrame::build("BTC-USD", &[], &[], &spec(1)).unwrap_err();
        assert!(matches!(err, PipelineError::NoCandles { .. }));
    }

    #[test]
    fn test_invalid_ma_range() {
        let config = FeatureConfig {
            ma_min: 10,
            ma_max: 10,
            ..FeatureConfig::default()
        };
        assert!(matches!(
            FeatureSpec::from_config(&config, 288),
            Err(PipelineError::InvalidConfig(_))
        ));

        let config = FeatureConfig {
            ma_min: 10,
            ma_max: 50,
            ma_step: 10,
            ..FeatureConfig::default()
        };
        assert_eq!(
            FeatureSpec::from_config(&config, 288).unwrap().ma_windows,
            vec![10, 20, 30, 40]
        );
    }
}
