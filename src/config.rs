use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};
use crate::metrics::TimeUnit;
use crate::proxy::NamingPolicy;

/// Samples kept per call-site when nothing else is configured.
pub const DEFAULT_SAMPLE_SIZE: usize = 100;

pub const DEFAULT_NAME: &str = "latency-monitored";

/// Settings for one monitored source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Name the registry is reported under.
    pub name: String,
    /// Ring-buffer capacity per call-site. Must be positive.
    pub sample_size: usize,
    pub unit: TimeUnit,
    /// Create a monitor for every declared method before the first call
    /// (LATENCY_EAGER). When false, monitors appear on first use and each
    /// addition is announced to subscribers.
    pub add_all_monitors_at_startup: bool,
    pub naming: NamingPolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            sample_size: DEFAULT_SAMPLE_SIZE,
            unit: TimeUnit::default(),
            add_all_monitors_at_startup: true,
            naming: NamingPolicy::default(),
        }
    }
}

impl MonitorConfig {
    /// Reads overrides from the environment on top of the defaults.
    ///
    /// Unset variables keep their default; set-but-unparsable ones fail.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            name: std::env::var("LATENCY_MONITOR_NAME").unwrap_or(defaults.name),
            sample_size: match std::env::var("LATENCY_SAMPLE_SIZE") {
                Ok(v) => v.trim().parse::<usize>().map_err(|_| {
                    MonitorError::InvalidConfiguration(format!(
                        "LATENCY_SAMPLE_SIZE must be a positive integer, got '{v}'"
                    ))
                })?,
                Err(_) => defaults.sample_size,
            },
            unit: match std::env::var("LATENCY_TIME_UNIT") {
                Ok(v) => v.parse()?,
                Err(_) => defaults.unit,
            },
            add_all_monitors_at_startup: match std::env::var("LATENCY_EAGER") {
                Ok(v) => parse_flag("LATENCY_EAGER", &v)?,
                Err(_) => defaults.add_all_monitors_at_startup,
            },
            naming: match std::env::var("LATENCY_NAMING") {
                Ok(v) => v.parse()?,
                Err(_) => defaults.naming,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_size == 0 {
            return Err(MonitorError::InvalidConfiguration(
                "sample_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    pub fn with_unit(mut self, unit: TimeUnit) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_eager_monitors(mut self, eager: bool) -> Self {
        self.add_all_monitors_at_startup = eager;
        self
    }

    pub fn with_naming(mut self, naming: NamingPolicy) -> Self {
        self.naming = naming;
        self
    }
}

fn parse_flag(var: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(MonitorError::InvalidConfiguration(format!(
            "{var} must be a boolean, got '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = MonitorConfig::default();
        assert_eq!(config.sample_size, 100);
        assert_eq!(config.unit, TimeUnit::Milliseconds);
        assert!(config.add_all_monitors_at_startup);
        assert_eq!(config.naming, NamingPolicy::Qualified);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_sample_size_is_invalid() {
        let config = MonitorConfig::default().with_sample_size(0);
        assert!(matches!(
            config.validate(),
            Err(MonitorError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn flags_accept_common_spellings() {
        assert!(parse_flag("X", "TRUE").unwrap());
        assert!(!parse_flag("X", "0").unwrap());
        assert!(parse_flag("X", "maybe").is_err());
    }

    #[test]
    fn deserializes_partial_settings() {
        let config: MonitorConfig = serde_json::from_str(
            r#"{"sample_size": 5, "unit": "microseconds", "naming": "method-name"}"#,
        )
        .unwrap();
        assert_eq!(config.sample_size, 5);
        assert_eq!(config.unit, TimeUnit::Microseconds);
        assert_eq!(config.naming, NamingPolicy::MethodName);
        assert!(config.add_all_monitors_at_startup);
        assert_eq!(config.name, DEFAULT_NAME);
    }
}
