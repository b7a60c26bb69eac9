//! Regressors of the fixed model roster.

pub mod gradient_boosting;
pub mod linear;
pub mod moving_average;
pub mod random_forest;
pub mod tree;

use coin_forecast_core::{ModelKind, TrainerConfig};
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::dataset::TrainTestSplit;
use crate::error::ModelError;

pub use gradient_boosting::GradientBoosting;
pub use linear::LinearModel;
pub use moving_average::MovingAverageModel;
pub use random_forest::RandomForest;

/// A fitted model that maps a feature row to a price.
pub trait Regressor {
    fn predict_row(&self, row: ArrayView1<'_, f32>) -> f64;

    fn predict(&self, x: &Array2<f32>) -> Vec<f64> {
        x.rows().into_iter().map(|row| self.predict_row(row)).collect()
    }
}

/// Any fitted roster member; the serialized form of artifact components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FittedModel {
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
    Linear(LinearModel),
    MovingAverage(MovingAverageModel),
}

impl FittedModel {
    #[must_use]
    pub fn kind(&self) -> ModelKind {
        match self {
            Self::RandomForest(_) => ModelKind::RandomForest,
            Self::GradientBoosting(_) => ModelKind::GradientBoosting,
            Self::Linear(_) => ModelKind::Linear,
            Self::MovingAverage(_) => ModelKind::MovingAverage,
        }
    }

    /// Column reported by a moving-average model.
    #[must_use]
    pub fn moving_average_column(&self) -> Option<&str> {
        match self {
            Self::MovingAverage(model) => Some(model.column()),
            _ => None,
        }
    }
}

impl Regressor for FittedModel {
    fn predict_row(&self, row: ArrayView1<'_, f32>) -> f64 {
        match self {
            Self::RandomForest(model) => model.predict_row(row),
            Self::GradientBoosting(model) => model.predict_row(row),
            Self::Linear(model) => model.predict_row(row),
            Self::MovingAverage(model) => model.predict_row(row),
        }
    }
}

/// Fits one roster member on the train split.
///
/// # Errors
/// Propagates the fit error of the model.
pub fn fit_model(
    kind: ModelKind,
    split: &TrainTestSplit,
    config: &TrainerConfig,
) -> Result<FittedModel, ModelError> {
    let model = match kind {
        ModelKind::RandomForest => {
            FittedModel::RandomForest(RandomForest::fit(&split.train, &config.random_forest)?)
        }
        ModelKind::GradientBoosting => FittedModel::GradientBoosting(GradientBoosting::fit(
            &split.train,
            &split.test,
            &config.gradient_boosting,
        )?),
        ModelKind::Linear => FittedModel::Linear(LinearModel::fit(&split.train)?),
        ModelKind::MovingAverage => {
            FittedModel::MovingAverage(MovingAverageModel::fit(&split.train)?)
        }
    };
    Ok(model)
}
