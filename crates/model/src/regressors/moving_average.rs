//! Baseline that reports a precomputed rolling mean of close.

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use super::Regressor;
use crate::dataset::Dataset;
use crate::error::ModelError;
use crate::features::MA_CLOSE_PREFIX;
use crate::metrics::mae;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovingAverageModel {
    column: String,
    index: usize,
}

impl MovingAverageModel {
    /// Picks the `ma_close_*` column with the lowest MAE against the train targets.
    ///
    /// # Errors
    /// Returns `ModelError::NoMovingAverage` if the dataset has no such column
    /// and `ModelError::EmptyDataset` if it has no rows.
    pub fn fit(train: &Dataset) -> Result<Self, ModelError> {
        if train.is_empty() {
            return Err(ModelError::EmptyDataset);
        }
        let targets = train.targets_f64();

        let mut best: Option<(Self, f64)> = None;
        for (index, name) in train.feature_names.iter().enumerate() {
            if !name.starts_with(MA_CLOSE_PREFIX) {
                continue;
            }
            let predictions: Vec<f64> = train
                .features
                .column(index)
                .iter()
                .map(|&v| f64::from(v))
                .collect();
            let score = mae(&predictions, &targets);
            if best.as_ref().map_or(true, |(_, b)| score < *b) {
                best = Some((
                    Self {
                        column: name.clone(),
                        index,
                    },
                    score,
                ));
            }
        }

        let (model, score) = best.ok_or(ModelError::NoMovingAverage)?;
        tracing::debug!(column = %model.column, train_mae = score, "Selected moving average");
        Ok(model)
    }

    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }
}

impl Regressor for MovingAverageModel {
    fn predict_row(&self, row: ArrayView1<'_, f32>) -> f64 {
        row.get(self.index).map_or(f64::NAN, |&v| f64::from(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    #[test]
    fn test_picks_closest_average() {
        // ma_close_10 is off by 1, ma_close_20 by 3
        let features = Array2::from_shape_fn((5, 3), |(i, j)| match j {
            0 => 100.0,
            1 => i as f32 + 1.0,
            _ => i as f32 + 3.0,
        });
        let targets = Array1::from_iter((0..5).map(|i| i as f32));
        let data = Dataset::new(
            vec!["close".into(), "ma_close_10".into(), "ma_close_20".into()],
            features,
            targets,
            (0..5).collect(),
        )
        .unwrap();

        let model = MovingAverageModel::fit(&data).unwrap();

        assert_eq!(model.column(), "ma_close_10");
        assert_eq!(model.predict_row(data.row(2)), 3.0);
    }

    #[test]
    fn test_requires_moving_average_column() {
        let data = Dataset::new(
            vec!["close".into()],
            Array2::zeros((3, 1)),
            Array1::zeros(3),
            vec![0, 1, 2],
        )
        .unwrap();
        assert!(matches!(
            MovingAverageModel::fit(&data),
            Err(ModelError::NoMovingAverage)
        ));
    }
}
