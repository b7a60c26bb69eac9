use thiserror::Error;

/// Errors raised while fitting, scoring or persisting models.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Matrix is singular and cannot be inverted")]
    SingularMatrix,

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Training dataset is empty")]
    EmptyDataset,

    #[error("Invalid train/test split: {0}")]
    InvalidSplit(String),

    #[error("No moving-average column among the features")]
    NoMovingAverage,

    #[error("Non-finite value in {0}")]
    NonFinite(String),

    #[error("Artifact IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Artifact JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
