use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Windowed VWAP channel parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VwapConfig {
    /// Sliding window length in bars
    pub period: usize,
    /// Channel half-width in standard deviations
    pub std_dev_mult: f64,
    /// Clear the window when the calendar day changes
    pub reset_daily: bool,
    /// Use (high + low + close) / 3 instead of close
    pub use_typical_price: bool,
}

impl Default for VwapConfig {
    fn default() -> Self {
        Self {
            period: 20,
            std_dev_mult: 2.0,
            reset_daily: false,
            use_typical_price: true,
        }
    }
}

impl VwapConfig {
    pub fn validate(&self) -> Result<()> {
        if self.period < 1 {
            return Err(Error::InvalidConfig("period must be >= 1".to_string()));
        }
        if !self.std_dev_mult.is_finite() || self.std_dev_mult < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "std_dev_mult must be a finite value >= 0, got {}",
                self.std_dev_mult
            )));
        }
        Ok(())
    }
}

/// Strategy-level parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategyConfig {
    /// Fraction of equity committed per entry, in (0, 1]
    pub target_percent: f64,
    pub vwap: VwapConfig,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            target_percent: 0.95,
            vwap: VwapConfig::default(),
        }
    }
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<()> {
        validate_target_percent(self.target_percent)?;
        self.vwap.validate()
    }
}

pub(crate) fn validate_target_percent(target_percent: f64) -> Result<()> {
    if !(target_percent > 0.0 && target_percent <= 1.0) {
        return Err(Error::InvalidConfig(format!(
            "target_percent must be in (0, 1], got {}",
            target_percent
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BacktestConfig {
    pub initial_cash: f64,
    pub bars: usize,
    pub interval_minutes: i64,
    pub seed: u64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_cash: 100_000.0,
            bars: 1_000,
            interval_minutes: 5,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub backtest: BacktestConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from `config/` and the environment
    pub fn load() -> Result<Self> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    ///
    /// Sources, later ones winning: built-in defaults, `<dir>/default.toml`,
    /// `VWAPBOT__*` environment variables (e.g. `VWAPBOT__STRATEGY__VWAP__PERIOD`).
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref();
        let defaults = AppConfig::default();

        let builder = Config::builder()
            .set_default("strategy.target_percent", defaults.strategy.target_percent)?
            .set_default("strategy.vwap.period", defaults.strategy.vwap.period as i64)?
            .set_default("strategy.vwap.std_dev_mult", defaults.strategy.vwap.std_dev_mult)?
            .set_default("strategy.vwap.reset_daily", defaults.strategy.vwap.reset_daily)?
            .set_default(
                "strategy.vwap.use_typical_price",
                defaults.strategy.vwap.use_typical_price,
            )?
            .set_default("backtest.initial_cash", defaults.backtest.initial_cash)?
            .set_default("backtest.bars", defaults.backtest.bars as i64)?
            .set_default("backtest.interval_minutes", defaults.backtest.interval_minutes)?
            .set_default("backtest.seed", defaults.backtest.seed as i64)?
            .set_default("logging.level", defaults.logging.level)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(
                Environment::with_prefix("VWAPBOT")
                    .separator("__")
                    .try_parsing(true),
            );

        let app: AppConfig = builder.build()?.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> Result<()> {
        self.strategy.validate()?;
        if !self.backtest.initial_cash.is_finite() || self.backtest.initial_cash <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "initial_cash must be positive, got {}",
                self.backtest.initial_cash
            )));
        }
        if self.backtest.interval_minutes <= 0 {
            return Err(Error::InvalidConfig(
                "interval_minutes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.strategy.vwap.period, 20);
        assert_eq!(config.strategy.target_percent, 0.95);
        assert!(config.strategy.vwap.use_typical_price);
        assert!(!config.strategy.vwap.reset_daily);
    }

    #[test]
    fn test_zero_period_rejected() {
        let config = VwapConfig {
            period: 0,
            ..VwapConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_negative_std_dev_mult_rejected() {
        let config = VwapConfig {
            std_dev_mult: -0.5,
            ..VwapConfig::default()
        };
        assert!(config.validate().is_err());

        let config = VwapConfig {
            std_dev_mult: f64::NAN,
            ..VwapConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_target_percent_bounds() {
        assert!(validate_target_percent(1.0).is_ok());
        assert!(validate_target_percent(0.01).is_ok());
        assert!(validate_target_percent(0.0).is_err());
        assert!(validate_target_percent(1.5).is_err());
        assert!(validate_target_percent(f64::NAN).is_err());
    }

    #[test]
    fn test_load_from_missing_dir_uses_defaults() {
        let config = AppConfig::load_from("does-not-exist").unwrap();
        assert_eq!(config.strategy.vwap.period, 20);
        assert_eq!(config.backtest.initial_cash, 100_000.0);
        assert_eq!(config.logging.level, "info");
    }
}
