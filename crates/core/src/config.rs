use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub exchange: ExchangeConfig,
    pub pipeline: PipelineConfig,
    pub features: FeatureConfig,
    pub trainer: TrainerConfig,
    pub output: OutputConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub api_url: String,
    /// Candle size in seconds (300 = five minutes).
    pub granularity_secs: i64,
    pub requests_per_second: u32,
    pub timeout_secs: u64,
    /// First UTC day collected by ingestion.
    pub start_date: NaiveDate,
    pub min_day_candles: i64,
    pub max_day_candles: i64,
    pub max_consecutive_empty: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub coins: Vec<String>,
    pub windows: Vec<PredictionWindow>,
}

/// A named forecast horizon, measured in candles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionWindow {
    pub name: String,
    pub horizon: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub ma_min: usize,
    /// Exclusive upper bound of the moving-average windows.
    pub ma_max: usize,
    pub ma_step: usize,
    pub volume_averages: bool,
    pub reference_coin: Option<String>,
    pub auxiliary_series: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub test_split: TestSplitConfig,
    pub models: Vec<ModelKind>,
    pub random_forest: RandomForestConfig,
    pub gradient_boosting: GradientBoostingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TestSplitConfig {
    /// The latest `rows` observations.
    Tail { rows: usize },
    /// The latest `tail` observations plus `sample` earlier ones drawn with `seed`.
    TailPlusSample { tail: usize, sample: usize, seed: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    RandomForest,
    GradientBoosting,
    Linear,
    MovingAverage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomForestConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Features tried per split; one third of the features when unset.
    pub max_features: Option<usize>,
    /// Fraction of training rows drawn (without replacement) for each tree.
    pub sample_fraction: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientBoostingConfig {
    pub max_rounds: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    pub subsample: f64,
    pub early_stopping_rounds: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root of the per-coin model and snapshot directories.
    pub models_dir: String,
    pub chart_months: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/db.sqlite".to_string(),
            max_connections: 1,
        }
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.exchange.coinbase.com".to_string(),
            granularity_secs: 300,
            requests_per_second: 1,
            timeout_secs: 30,
            start_date: NaiveDate::from_ymd_opt(2019, 1, 1).unwrap_or_default(),
            min_day_candles: 200,
            max_day_candles: 300,
            max_consecutive_empty: 5,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            coins: vec!["BTC-USD".to_string(), "ETH-USD".to_string()],
            windows: vec![PredictionWindow {
                name: "24h".to_string(),
                horizon: 288,
            }],
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            ma_min: 10,
            ma_max: 200,
            ma_step: 10,
            volume_averages: false,
            reference_coin: None,
            auxiliary_series: Vec::new(),
        }
    }
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            test_split: TestSplitConfig::Tail { rows: 3000 },
            models: ModelKind::ALL.to_vec(),
            random_forest: RandomForestConfig::default(),
            gradient_boosting: GradientBoostingConfig::default(),
        }
    }
}

impl Default for RandomForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 101,
            max_depth: 12,
            min_samples_leaf: 5,
            max_features: None,
            sample_fraction: 0.25,
            seed: 42,
        }
    }
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            max_rounds: 500,
            learning_rate: 0.1,
            max_depth: 6,
            min_samples_leaf: 1,
            subsample: 0.3,
            early_stopping_rounds: 3,
            seed: 42,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            models_dir: "models".to_string(),
            chart_months: 3,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::RandomForest,
        ModelKind::GradientBoosting,
        ModelKind::Linear,
        ModelKind::MovingAverage,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::RandomForest => "random_forest",
            ModelKind::GradientBoosting => "gradient_boosting",
            ModelKind::Linear => "linear",
            ModelKind::MovingAverage => "moving_average",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| PipelineError::InvalidConfig(format!("unknown model kind '{s}'")))
    }
}

impl FeatureConfig {
    /// Moving-average window sizes: `ma_min`, `ma_min + ma_step`, ... below `ma_max`.
    #[must_use]
    pub fn ma_windows(&self) -> Vec<usize> {
        if self.ma_step == 0 || self.ma_min == 0 {
            return Vec::new();
        }
        (self.ma_min..self.ma_max).step_by(self.ma_step).collect()
    }
}

impl AppConfig {
    /// Checks cross-field constraints that serde cannot express.
    ///
    /// # Errors
    /// Returns `PipelineError::InvalidConfig` describing the first violation.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let invalid = |msg: &str| Err(PipelineError::InvalidConfig(msg.to_string()));

        if self.pipeline.coins.is_empty() {
            return invalid("pipeline.coins must name at least one coin");
        }
        if self.pipeline.windows.is_empty() {
            return invalid("pipeline.windows must define at least one window");
        }
        let mut names = HashSet::new();
        for window in &self.pipeline.windows {
            if window.horizon == 0 {
                return invalid("pipeline.windows horizon must be positive");
            }
            if !names.insert(window.name.as_str()) {
                return Err(PipelineError::InvalidConfig(format!(
                    "duplicate prediction window '{}'",
                    window.name
                )));
            }
        }
        if self.features.ma_windows().is_empty() {
            return invalid("features.ma_min/ma_max/ma_step produce no moving-average windows");
        }
        if self.exchange.granularity_secs <= 0 {
            return invalid("exchange.granularity_secs must be positive");
        }
        if self.exchange.requests_per_second == 0 {
            return invalid("exchange.requests_per_second must be positive");
        }
        if self.exchange.max_consecutive_empty == 0 {
            return invalid("exchange.max_consecutive_empty must be positive");
        }
        if self.exchange.min_day_candles > self.exchange.max_day_candles {
            return invalid("exchange.min_day_candles exceeds exchange.max_day_candles");
        }
        if self.trainer.models.is_empty() {
            return invalid("trainer.models must list at least one model");
        }
        let unique: HashSet<_> = self.trainer.models.iter().collect();
        if unique.len() != self.trainer.models.len() {
            return invalid("trainer.models lists a model more than once");
        }
        let fraction = self.trainer.random_forest.sample_fraction;
        if !(fraction > 0.0 && fraction <= 1.0) {
            return invalid("trainer.random_forest.sample_fraction must be in (0, 1]");
        }
        let subsample = self.trainer.gradient_boosting.subsample;
        if !(subsample > 0.0 && subsample <= 1.0) {
            return invalid("trainer.gradient_boosting.subsample must be in (0, 1]");
        }
        Ok(())
    }

    /// # Errors
    /// Returns `PipelineError::UnsupportedCoin` if `coin` is not configured.
    pub fn ensure_coin(&self, coin: &str) -> Result<(), PipelineError> {
        if self.pipeline.coins.iter().any(|c| c == coin) {
            Ok(())
        } else {
            Err(PipelineError::UnsupportedCoin {
                coin: coin.to_string(),
            })
        }
    }

    /// Resolves the windows a command should process: the named one, or all of them.
    ///
    /// # Errors
    /// Returns `PipelineError::UnsupportedWindow` for an unknown name.
    pub fn select_windows(&self, name: Option<&str>) -> Result<Vec<PredictionWindow>, PipelineError> {
        match name {
            None => Ok(self.pipeline.windows.clone()),
            Some(name) => self
                .pipeline
                .windows
                .iter()
                .find(|w| w.name == name)
                .cloned()
                .map(|w| vec![w])
                .ok_or_else(|| PipelineError::UnsupportedWindow {
                    window: name.to_string(),
                }),
        }
    }
}
