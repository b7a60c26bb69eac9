//! Gradient-boosted regression trees with squared-error loss.
//!
//! Every round fits a tree to the current residuals on a row subsample and
//! adds it scaled by the learning rate. Training stops once the evaluation
//! MAE has not improved for `early_stopping_rounds` rounds, and the ensemble
//! is cut back to its best round.

use coin_forecast_core::GradientBoostingConfig;
use ndarray::ArrayView1;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::tree::{RegressionTree, TreeParams};
use super::Regressor;
use crate::dataset::Dataset;
use crate::error::ModelError;
use crate::metrics::mae;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    base_score: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoosting {
    /// Fits on `train`, using `eval` for early stopping.
    ///
    /// # Errors
    /// Returns `ModelError::EmptyDataset` if `train` has no rows.
    pub fn fit(
        train: &Dataset,
        eval: &Dataset,
        config: &GradientBoostingConfig,
    ) -> Result<Self, ModelError> {
        let n = train.n_samples();
        if n == 0 {
            return Err(ModelError::EmptyDataset);
        }

        let y = train.targets_f64();
        let eval_y = eval.targets_f64();
        let base_score = y.iter().sum::<f64>() / n as f64;
        let params = TreeParams {
            max_depth: config.max_depth,
            min_samples_leaf: config.min_samples_leaf,
            max_features: None,
        };
        let sample_size = ((n as f64 * config.subsample).round() as usize).clamp(1, n);
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        let mut model = Self {
            base_score,
            learning_rate: config.learning_rate,
            trees: Vec::new(),
        };
        let mut train_pred = vec![base_score; n];
        let mut eval_pred = vec![base_score; eval.n_samples()];
        let mut best_mae = mae(&eval_pred, &eval_y);
        let mut best_rounds = 0;
        let mut residuals = vec![0.0; n];

        for round in 1..=config.max_rounds {
            for (r, (target, pred)) in residuals.iter_mut().zip(y.iter().zip(&train_pred)) {
                *r = target - pred;
            }
            let mut rows = rand::seq::index::sample(&mut rng, n, sample_size).into_vec();
            rows.sort_unstable();
            let tree = RegressionTree::fit(&train.features, &residuals, rows, &params, &mut rng);

            for (i, pred) in train_pred.iter_mut().enumerate() {
                *pred += config.learning_rate * tree.predict_row(train.row(i));
            }
            for (i, pred) in eval_pred.iter_mut().enumerate() {
                *pred += config.learning_rate * tree.predict_row(eval.row(i));
            }
            model.trees.push(tree);

            let eval_mae = mae(&eval_pred, &eval_y);
            if eval_mae < best_mae || !best_mae.is_finite() {
                best_mae = eval_mae;
                best_rounds = round;
            } else if round - best_rounds >= config.early_stopping_rounds.max(1) {
                tracing::debug!(round, best_rounds, best_mae, "Early stopping");
                break;
            }
        }

        model.trees.truncate(best_rounds);
        tracing::debug!(rounds = model.trees.len(), best_mae, "Fitted gradient boosting");
        Ok(model)
    }

    #[must_use]
    pub fn n_rounds(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for GradientBoosting {
    fn predict_row(&self, row: ArrayView1<'_, f32>) -> f64 {
        let mut prediction = self.base_score;
        for tree in &self.trees {
            prediction += self.learning_rate * tree.predict_row(row);
        }
        prediction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    fn dataset(range: std::ops::Range<usize>) -> Dataset {
        let n = range.len();
        let start = range.start;
        let features = Array2::from_shape_fn((n, 2), |(i, j)| {
            let t = (start + i) as f32;
            if j == 0 {
                t % 50.0
            } else {
                (t * 3.0) % 7.0
            }
        });
        let targets = Array1::from_iter((0..n).map(|i| ((start + i) % 50) as f32 * 1.5 + 10.0));
        Dataset::new(
            vec!["a".into(), "b".into()],
            features,
            targets,
            (0..n as i64).collect(),
        )
        .unwrap()
    }

    fn config() -> GradientBoostingConfig {
        GradientBoostingConfig {
            max_rounds: 200,
            learning_rate: 0.1,
            max_depth: 4,
            min_samples_leaf: 1,
            subsample: 0.5,
            early_stopping_rounds: 3,
            seed: 11,
        }
    }

    #[test]
    fn test_boosting_beats_the_mean() {
        let train = dataset(0..400);
        let eval = dataset(400..500);
        let model = GradientBoosting::fit(&train, &eval, &config()).unwrap();

        let baseline = vec![model.base_score; eval.n_samples()];
        let eval_y = eval.targets_f64();
        let boosted = mae(&model.predict(&eval.features), &eval_y);
        assert!(boosted < mae(&baseline, &eval_y) / 2.0);
        assert!(model.n_rounds() > 0);
    }

    #[test]
    fn test_early_stopping_keeps_best_round() {
        let train = dataset(0..300);
        let base = train.targets_f64().iter().sum::<f64>() / 300.0;
        // evaluation rows whose best prediction is the untouched base score
        let eval = Dataset {
            targets: Array1::from_elem(50, base as f32),
            ..dataset(300..350)
        };

        let model = GradientBoosting::fit(&train, &eval, &config()).unwrap();

        assert_eq!(model.n_rounds(), 0);
        assert!((model.predict_row(eval.row(0)) - base).abs() < 1e-9);
    }

    #[test]
    fn test_zero_rounds_predicts_base_score() {
        let train = dataset(0..20);
        let model = GradientBoosting::fit(
            &train,
            &train,
            &GradientBoostingConfig {
                max_rounds: 0,
                ..config()
            },
        )
        .unwrap();
        assert_eq!(model.n_rounds(), 0);
        assert!((model.predict_row(train.row(0)) - model.base_score).abs() < 1e-12);
    }
}
