use thiserror::Error;

/// Fatal conditions of the pipeline stages.
///
/// Stages return these wrapped in `anyhow::Error`; callers that need to react
/// to a specific condition use `downcast_ref::<PipelineError>()`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unsupported coin: {coin}")]
    UnsupportedCoin { coin: String },

    #[error("Unsupported prediction window: {window}")]
    UnsupportedWindow { window: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No candles stored for {coin}")]
    NoCandles { coin: String },

    #[error("No trained model for {coin} ({window})")]
    NoModel { coin: String, window: String },

    #[error("No training performance recorded for model {model_id} of {coin} ({window})")]
    MissingPerformance {
        coin: String,
        window: String,
        model_id: String,
    },

    #[error("Model features do not match the feature frame: expected {expected:?}, got {actual:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Exchange returned {consecutive} consecutive empty responses for {coin}")]
    UpstreamOutage { coin: String, consecutive: u32 },
}
