//! Simulation configuration and its YAML/JSON loaders.

use std::path::Path;

use odesim_core::{Real, Symbol};
use odesim_solver::AlgorithmConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SimResult;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(field: &str, value: impl ToString, reason: &str) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result logging options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Write results to standard output when no logger is attached.
    pub results: bool,
    /// Log every accepted sub-state instead of one row per domain step.
    pub all_states: bool,
    pub separator: String,
    /// Column width; header names are padded or truncated to it.
    pub format_len: usize,
    /// Significant digits; `None` prints the shortest exact representation.
    pub precision: Option<usize>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            results: false,
            all_states: true,
            separator: ",".to_string(),
            format_len: 12,
            precision: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BehaviourConfig {
    /// Pause after every domain step, in milliseconds.
    pub delay_ms: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SymbolsConfig {
    /// Keep X symbols in insertion order instead of sorting them.
    pub no_ordering: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Name of the independent variable.
    pub domain: Symbol,
    pub log: LogConfig,
    pub behaviour: BehaviourConfig,
    pub algorithm: AlgorithmConfig,
    pub symbols: SymbolsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            domain: Symbol::new("time"),
            log: LogConfig::default(),
            behaviour: BehaviourConfig::default(),
            algorithm: AlgorithmConfig::default(),
            symbols: SymbolsConfig::default(),
        }
    }
}

impl Config {
    /// Checks hard constraints and warns about suspicious step bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.domain.trim().is_empty() {
            return Err(ConfigError::invalid("domain", "", "must not be empty"));
        }
        let algorithm = &self.algorithm;
        if algorithm.steps < 1 {
            return Err(ConfigError::invalid(
                "algorithm.steps",
                algorithm.steps,
                "must be at least 1",
            ));
        }
        if !(0.0..1.0).contains(&algorithm.relaxation_factor) {
            return Err(ConfigError::invalid(
                "algorithm.relaxation_factor",
                algorithm.relaxation_factor,
                "must be in [0, 1)",
            ));
        }
        check_positive("algorithm.step.min", algorithm.step.min)?;
        check_positive("algorithm.step.max", algorithm.step.max)?;
        check_positive("algorithm.error.max", algorithm.error.max)?;
        if algorithm.iteration_max == Some(0) {
            return Err(ConfigError::invalid(
                "algorithm.iteration_max",
                0,
                "must be at least 1",
            ));
        }
        if self.log.separator.is_empty() {
            return Err(ConfigError::invalid("log.separator", "", "must not be empty"));
        }
        if algorithm.step_bounds_inconsistent() {
            warn!(
                min = ?algorithm.step.min,
                max = ?algorithm.step.max,
                "step.min exceeds step.max; adaptive solvers will clamp to step.max"
            );
        }
        Ok(())
    }

    pub fn from_yaml_str(content: &str) -> SimResult<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> SimResult<Self> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> SimResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

fn check_positive(field: &str, value: Option<Real>) -> Result<(), ConfigError> {
    match value {
        Some(v) if !(v.is_finite() && v > 0.0) => {
            Err(ConfigError::invalid(field, v, "must be positive and finite"))
        }
        _ => Ok(()),
    }
}

pub fn load_yaml(path: &Path) -> SimResult<Config> {
    let content = std::fs::read_to_string(path)?;
    Config::from_yaml_str(&content)
}

pub fn load_json(path: &Path) -> SimResult<Config> {
    let content = std::fs::read_to_string(path)?;
    Config::from_json_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;
    use odesim_solver::IntegratorType;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.domain.as_str(), "time");
        assert_eq!(config.algorithm.steps, 1);
        assert_eq!(config.algorithm.solver, Some(IntegratorType::Rk4));
        config.validate().unwrap();
    }

    #[test]
    fn yaml_partial_document_fills_defaults() {
        let config = Config::from_yaml_str(
            "domain: t\nalgorithm:\n  solver: rkf45\n  steps: 4\n  error:\n    max: 1.0e-6\n",
        )
        .unwrap();
        assert_eq!(config.domain.as_str(), "t");
        assert_eq!(config.algorithm.solver, Some(IntegratorType::Rkf45));
        assert_eq!(config.algorithm.steps, 4);
        assert_eq!(config.algorithm.error.max, Some(1e-6));
        assert_eq!(config.log, LogConfig::default());
    }

    #[test]
    fn json_document() {
        let config = Config::from_json_str(
            r#"{"log": {"separator": ";", "precision": 5}, "symbols": {"no_ordering": true}}"#,
        )
        .unwrap();
        assert_eq!(config.log.separator, ";");
        assert_eq!(config.log.precision, Some(5));
        assert!(config.symbols.no_ordering);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = Config::from_yaml_str("algorithm:\n  stepz: 3\n").unwrap_err();
        assert!(matches!(err, SimError::Yaml(_)));
    }

    #[test]
    fn zero_steps_rejected() {
        let err = Config::from_yaml_str("algorithm:\n  steps: 0\n").unwrap_err();
        assert!(matches!(err, SimError::Config(_)));
    }

    #[test]
    fn empty_domain_rejected() {
        let mut config = Config::default();
        config.domain = Symbol::new(" ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn relaxation_and_bounds_checked() {
        let mut config = Config::default();
        config.algorithm.relaxation_factor = 1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.algorithm.step.min = Some(-1.0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.algorithm.error.max = Some(Real::NAN);
        assert!(config.validate().is_err());

        // inconsistent bounds only warn
        let mut config = Config::default();
        config.algorithm.step.min = Some(1.0);
        config.algorithm.step.max = Some(0.1);
        config.validate().unwrap();
    }

    #[test]
    fn yaml_round_trip() {
        let mut config = Config::default();
        config.algorithm.solver = Some(IntegratorType::NewtonRaphson);
        config.algorithm.iteration_max = Some(20);
        let text = config.to_yaml().unwrap();
        assert_eq!(Config::from_yaml_str(&text).unwrap(), config);
    }
}
