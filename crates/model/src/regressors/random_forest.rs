//! Random forest regressor.
//!
//! Each tree sees a `sample_fraction` share of the training rows drawn
//! without replacement and tries `max_features` random features per split.

use coin_forecast_core::RandomForestConfig;
use ndarray::ArrayView1;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::tree::{RegressionTree, TreeParams};
use super::Regressor;
use crate::dataset::Dataset;
use crate::error::ModelError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    /// # Errors
    /// Returns `ModelError::EmptyDataset` if `train` has no rows.
    pub fn fit(train: &Dataset, config: &RandomForestConfig) -> Result<Self, ModelError> {
        let n = train.n_samples();
        if n == 0 {
            return Err(ModelError::EmptyDataset);
        }

        let n_features = train.n_features();
        let params = TreeParams {
            max_depth: config.max_depth,
            min_samples_leaf: config.min_samples_leaf,
            max_features: Some(config.max_features.unwrap_or((n_features / 3).max(1))),
        };
        let sample_size = ((n as f64 * config.sample_fraction).round() as usize).clamp(1, n);
        let y = train.targets_f64();
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        let mut trees = Vec::with_capacity(config.n_trees);
        for _ in 0..config.n_trees.max(1) {
            let mut rows = rand::seq::index::sample(&mut rng, n, sample_size).into_vec();
            rows.sort_unstable();
            trees.push(RegressionTree::fit(
                &train.features,
                &y,
                rows,
                &params,
                &mut rng,
            ));
        }

        tracing::debug!(
            trees = trees.len(),
            sample_size,
            max_features = ?params.max_features,
            "Fitted random forest"
        );
        Ok(Self { trees })
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for RandomForest {
    fn predict_row(&self, row: ArrayView1<'_, f32>) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict_row(row)).sum();
        sum / self.trees.len() as f64
    }
}
