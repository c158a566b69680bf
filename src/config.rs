use crate::heuristic::{
    Heuristic,
    HeuristicParams,
};
use thiserror::Error;

/// Errors raised when validating the import configuration.
#[derive(Debug, Error, Copy, Clone, PartialEq)]
pub enum ConfigError {
    #[error("option `{name}` must be a percent in 0..=100 but is {value}")]
    PercentOutOfRange { name: &'static str, value: u8 },
    #[error("option `{name}` must lie in (0, 1] but is {value}")]
    AlphaOutOfRange { name: &'static str, value: f64 },
    #[error("unknown import heuristic code {0}, expected 0..=8")]
    UnknownHeuristic(u8),
}

/// The options that steer stability estimation and clause import.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ImportConfig {
    /// Share of the offered literals that may be imported per pass, in percent.
    pub import_percent: u8,
    /// The heuristic used to rank import candidates.
    pub import_heuristic: Heuristic,
    /// In percent.
    pub false_stability_threshold: u8,
    /// In percent.
    pub true_stability_threshold: u8,
    /// In percent.
    pub true_literal_penalty: u8,
    /// Decay rate of the per-variable stability estimators.
    pub stability_ema_alpha: f64,
    /// Decay rate of the trail sampling averages.
    pub trail_sample_alpha: f64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            import_percent: 100,
            import_heuristic: Heuristic::Size,
            false_stability_threshold: 90,
            true_stability_threshold: 90,
            true_literal_penalty: 50,
            stability_ema_alpha: 1e-3,
            trail_sample_alpha: 1e-2,
        }
    }
}

fn ensure_percent(name: &'static str, value: u8) -> Result<(), ConfigError> {
    if value > 100 {
        return Err(ConfigError::PercentOutOfRange { name, value })
    }
    Ok(())
}

fn ensure_alpha(name: &'static str, value: f64) -> Result<(), ConfigError> {
    // Written so that NaN is rejected as well.
    if !(value > 0.0 && value <= 1.0) {
        return Err(ConfigError::AlphaOutOfRange { name, value })
    }
    Ok(())
}

impl ImportConfig {
    /// Checks that all options are within their supported ranges.
    ///
    /// # Errors
    ///
    /// Names the first option that is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_percent("import_percent", self.import_percent)?;
        ensure_percent("false_stability_threshold", self.false_stability_threshold)?;
        ensure_percent("true_stability_threshold", self.true_stability_threshold)?;
        ensure_percent("true_literal_penalty", self.true_literal_penalty)?;
        ensure_alpha("stability_ema_alpha", self.stability_ema_alpha)?;
        ensure_alpha("trail_sample_alpha", self.trail_sample_alpha)?;
        Ok(())
    }

    /// Returns the share of offered literals to import as a fraction.
    pub fn import_ratio(&self) -> f64 {
        f64::from(self.import_percent) / 100.0
    }

    /// Returns the thresholds and penalties as fractions.
    pub fn heuristic_params(&self) -> HeuristicParams {
        HeuristicParams {
            false_threshold: f64::from(self.false_stability_threshold) / 100.0,
            true_threshold: f64::from(self.true_stability_threshold) / 100.0,
            true_penalty: f64::from(self.true_literal_penalty) / 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(ImportConfig::default().validate(), Ok(()));
    }

    #[test]
    fn percents_are_checked() {
        let config = ImportConfig {
            true_literal_penalty: 101,
            ..ImportConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::PercentOutOfRange {
                name: "true_literal_penalty",
                value: 101
            })
        );
    }

    #[test]
    fn alphas_are_checked() {
        for alpha in [0.0, -0.5, 1.5, f64::NAN] {
            let config = ImportConfig {
                stability_ema_alpha: alpha,
                ..ImportConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::AlphaOutOfRange { name: "stability_ema_alpha", .. })
            ));
        }
        let config = ImportConfig {
            trail_sample_alpha: 1.0,
            ..ImportConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn percents_become_fractions() {
        let config = ImportConfig {
            import_percent: 50,
            false_stability_threshold: 80,
            true_stability_threshold: 70,
            true_literal_penalty: 25,
            ..ImportConfig::default()
        };
        assert_eq!(config.import_ratio(), 0.5);
        let params = config.heuristic_params();
        assert_eq!(params.false_threshold, 0.8);
        assert_eq!(params.true_threshold, 0.7);
        assert_eq!(params.true_penalty, 0.25);
    }
}
