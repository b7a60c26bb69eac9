pub mod config;
pub mod config_loader;
pub mod error;
pub mod types;

pub use config::{
    AppConfig, DatabaseConfig, ExchangeConfig, FeatureConfig, GradientBoostingConfig, LogConfig,
    ModelKind, OutputConfig, PipelineConfig, PredictionWindow, RandomForestConfig,
    TestSplitConfig, TrainerConfig,
};
pub use config_loader::ConfigLoader;
pub use error::PipelineError;
pub use types::{day_of, day_start, AuxPoint, Candle};
