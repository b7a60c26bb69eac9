use std::path::Path;

use crate::config::AppConfig;
use crate::error::PipelineError;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

pub const DEFAULT_CONFIG_PATH: &str = "config/Config.toml";
pub const ENV_PREFIX: &str = "COINFC_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads application configuration from `config/Config.toml` and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be parsed or fails validation.
    pub fn load() -> Result<AppConfig> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Loads application configuration by merging defaults, a TOML file, and
    /// `COINFC_`-prefixed environment variables (nested keys split on `__`).
    ///
    /// A missing file is not an error; every key falls back to its default.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be parsed or fails validation.
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig> {
        let path = path.as_ref();
        let config: AppConfig = Self::figment(path)
            .extract()
            .map_err(|e| PipelineError::InvalidConfig(e.to_string()))
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModelKind, TestSplitConfig};
    use figment::Jail;

    #[test]
    fn test_missing_file_uses_defaults() {
        Jail::expect_with(|_jail| {
            let config = ConfigLoader::load_from("does/not/exist.toml").unwrap();
            assert_eq!(config.exchange.granularity_secs, 300);
            assert_eq!(config.pipeline.windows[0].name, "24h");
            assert_eq!(config.pipeline.windows[0].horizon, 288);
            assert_eq!(config.output.chart_months, 3);
            Ok(())
        });
    }

    #[test]
    fn test_toml_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "Config.toml",
                r#"
                [pipeline]
                coins = ["SOL-USD"]
                windows = [{ name = "1h", horizon = 12 }]

                [features]
                ma_min = 5
                ma_max = 25
                ma_step = 5
                reference_coin = "BTC-USD"

                [trainer]
                models = ["linear", "moving_average"]
                test_split = { kind = "tail", rows = 500 }
                "#,
            )?;

            let config = ConfigLoader::load_from("Config.toml").unwrap();
            assert_eq!(config.pipeline.coins, vec!["SOL-USD".to_string()]);
            assert_eq!(config.pipeline.windows[0].horizon, 12);
            assert_eq!(config.features.ma_windows(), vec![5, 10, 15, 20]);
            assert_eq!(config.features.reference_coin.as_deref(), Some("BTC-USD"));
            assert_eq!(
                config.trainer.models,
                vec![ModelKind::Linear, ModelKind::MovingAverage]
            );
            assert_eq!(config.trainer.test_split, TestSplitConfig::Tail { rows: 500 });
            // untouched sections keep their defaults
            assert_eq!(config.trainer.random_forest.n_trees, 101);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_nested_keys() {
        Jail::expect_with(|jail| {
            jail.create_file("Config.toml", "[output]\nchart_months = 6\n")?;
            jail.set_env("COINFC_OUTPUT__CHART_MONTHS", "12");
            jail.set_env("COINFC_DATABASE__URL", "sqlite::memory:");

            let config = ConfigLoader::load_from("Config.toml").unwrap();
            assert_eq!(config.output.chart_months, 12);
            assert_eq!(config.database.url, "sqlite::memory:");
            Ok(())
        });
    }

    #[test]
    fn test_invalid_values_fail_at_load() {
        Jail::expect_with(|jail| {
            jail.create_file("Config.toml", "[features]\nma_step = 0\n")?;

            let err = ConfigLoader::load_from("Config.toml").unwrap_err();
            assert!(matches!(
                err.downcast_ref::<PipelineError>(),
                Some(PipelineError::InvalidConfig(_))
            ));
            Ok(())
        });
    }

    #[test]
    fn test_malformed_toml_is_invalid_config() {
        Jail::expect_with(|jail| {
            jail.create_file("Config.toml", "[exchange]\ngranularity_secs = \"five\"\n")?;

            let err = ConfigLoader::load_from("Config.toml").unwrap_err();
            assert!(err.downcast_ref::<PipelineError>().is_some());
            Ok(())
        });
    }
}
