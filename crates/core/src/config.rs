//! Monitor policy configuration

use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Seconds before expiry at which the warning is shown
pub const WARNING_THRESHOLD_SECS: u64 = 5 * 60;

/// Seconds between two expiration checks
pub const POLL_INTERVAL_SECS: u64 = 30;

/// Seconds between two countdown updates
pub const TICK_INTERVAL_SECS: u64 = 1;

/// Environment prefix for configuration overrides (`EXPIRY_POLL_INTERVAL_SECS`, ...)
pub const ENV_PREFIX: &str = "EXPIRY";

/// Timing policy for a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Warn once the token has this many seconds (or fewer) left
    pub warning_threshold_secs: u64,

    /// Cadence of the expiration poll
    pub poll_interval_secs: u64,

    /// Cadence of the countdown
    pub tick_interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            warning_threshold_secs: WARNING_THRESHOLD_SECS,
            poll_interval_secs: POLL_INTERVAL_SECS,
            tick_interval_secs: TICK_INTERVAL_SECS,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from file, with environment overrides
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed,
    /// or if the resulting policy is invalid
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with defaults and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables cannot be parsed
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let settings = config::Config::builder()
            .set_default("warning_threshold_secs", defaults.warning_threshold_secs)?
            .set_default("poll_interval_secs", defaults.poll_interval_secs)?
            .set_default("tick_interval_secs", defaults.tick_interval_secs)?
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject policies that would spin a timer at zero interval
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidConfig`] naming the offending field
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(MonitorError::InvalidConfig(
                "poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.tick_interval_secs == 0 {
            return Err(MonitorError::InvalidConfig(
                "tick_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_policy() {
        let config = MonitorConfig::default();
        assert_eq!(config.warning_threshold_secs, 300);
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = MonitorConfig {
            poll_interval_secs: 0,
            ..MonitorConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(MonitorError::InvalidConfig(_))
        ));

        let config = MonitorConfig {
            tick_interval_secs: 0,
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_fills_missing_fields() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "warning_threshold_secs = 120").unwrap();

        let config = MonitorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.warning_threshold_secs, 120);
        assert_eq!(config.poll_interval_secs, POLL_INTERVAL_SECS);
        assert_eq!(config.tick_interval_secs, TICK_INTERVAL_SECS);
    }

    #[test]
    fn test_from_file_rejects_invalid_policy() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "poll_interval_secs = 0").unwrap();

        assert!(matches!(
            MonitorConfig::from_file(file.path()),
            Err(MonitorError::InvalidConfig(_))
        ));
    }
}
