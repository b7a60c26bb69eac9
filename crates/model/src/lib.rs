//! Forecasting stages of the coin price pipeline.
//!
//! This crate provides:
//! - Feature frames built from candles and daily auxiliary series
//! - Datasets and train/test split policies
//! - The regressor roster: random forest, gradient boosting, linear, moving average
//! - Ensemble enumeration and best-candidate selection
//! - The trainer, the artifact store and the predictor with its JSON snapshots

pub mod artifact;
pub mod dataset;
pub mod error;
pub mod features;
pub mod metrics;
pub mod predictor;
pub mod regressors;
pub mod selection;
pub mod snapshot;
pub mod trainer;

pub use artifact::{ArtifactStore, ModelArtifact};
pub use dataset::{Dataset, TrainTestSplit};
pub use error::ModelError;
pub use features::{load_frame, FeatureFrame, FeatureSpec};
pub use predictor::{predict_window, resolve_model, PredictionReport, ResolvedModel};
pub use regressors::{FittedModel, Regressor};
pub use selection::{select_best, Candidate};
pub use snapshot::{ChartsSnapshot, LatestSnapshot, PriceChange};
pub use trainer::{train_models, train_window, TrainedEnsemble, TrainingReport};
