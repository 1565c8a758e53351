//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every field has a default, so an empty file (or no file at all, via
//! [`Config::default`]) yields a working setup: connect to a local bridge,
//! retry every five seconds, and score with the stock penalty policy.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, ScorerError};

/// Longest accepted penalty cooldown (one day)
pub const MAX_COOLDOWN_S: u64 = 86_400;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Simulator host connection configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HostConfig {
    #[serde(default = "default_host_address")]
    pub address: String,

    #[serde(default = "default_app_name")]
    pub app_name: String,

    #[serde(default = "default_protocol_version")]
    pub protocol_version: u32,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
}

/// Scoring policy. These are product thresholds, not derived values.
#[derive(Debug, Deserialize, Clone)]
pub struct ScoringConfig {
    #[serde(default = "default_cooldown_s")]
    pub cooldown_s: u64,

    #[serde(default = "default_glitch_threshold_nm")]
    pub glitch_threshold_nm: f64,

    #[serde(default = "default_airborne_ground_speed_kt")]
    pub airborne_ground_speed_kt: f64,

    #[serde(default = "default_parked_ground_speed_kt")]
    pub parked_ground_speed_kt: f64,

    #[serde(default = "default_lights_floor_ft")]
    pub lights_floor_ft: u32,

    #[serde(default = "default_lights_ceiling_ft")]
    pub lights_ceiling_ft: u32,

    #[serde(default = "default_lights_penalty")]
    pub lights_penalty: u32,

    #[serde(default = "default_gear_check_altitude_ft")]
    pub gear_check_altitude_ft: u32,

    #[serde(default = "default_gear_check_vs_fpm")]
    pub gear_check_vs_fpm: f64,

    #[serde(default = "default_gear_penalty")]
    pub gear_penalty: u32,

    #[serde(default = "default_max_bank_deg")]
    pub max_bank_deg: u32,

    #[serde(default = "default_bank_penalty")]
    pub bank_penalty: u32,
}

/// Outbound notification channel configuration
#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for a daily rolling log file. Logs go to stderr when unset.
    #[serde(default)]
    pub log_dir: Option<String>,
}

// Default value functions
fn default_host_address() -> String { "127.0.0.1:5557".to_string() }
fn default_app_name() -> String { "Flight Scorer".to_string() }
fn default_protocol_version() -> u32 { 4 }
fn default_connect_timeout_ms() -> u64 { 3000 }
fn default_retry_interval_ms() -> u64 { 5000 }

fn default_cooldown_s() -> u64 { 60 }
fn default_glitch_threshold_nm() -> f64 { 10.0 }
fn default_airborne_ground_speed_kt() -> f64 { 50.0 }
fn default_parked_ground_speed_kt() -> f64 { 5.0 }
fn default_lights_floor_ft() -> u32 { 1000 }
fn default_lights_ceiling_ft() -> u32 { 10000 }
fn default_lights_penalty() -> u32 { 5 }
fn default_gear_check_altitude_ft() -> u32 { 1000 }
fn default_gear_check_vs_fpm() -> f64 { -100.0 }
fn default_gear_penalty() -> u32 { 10 }
fn default_max_bank_deg() -> u32 { 40 }
fn default_bank_penalty() -> u32 { 2 }

fn default_channel_capacity() -> usize { 64 }

fn default_log_level() -> String { "info".to_string() }

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            address: default_host_address(),
            app_name: default_app_name(),
            protocol_version: default_protocol_version(),
            connect_timeout_ms: default_connect_timeout_ms(),
            retry_interval_ms: default_retry_interval_ms(),
        }
    }
}

impl HostConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            cooldown_s: default_cooldown_s(),
            glitch_threshold_nm: default_glitch_threshold_nm(),
            airborne_ground_speed_kt: default_airborne_ground_speed_kt(),
            parked_ground_speed_kt: default_parked_ground_speed_kt(),
            lights_floor_ft: default_lights_floor_ft(),
            lights_ceiling_ft: default_lights_ceiling_ft(),
            lights_penalty: default_lights_penalty(),
            gear_check_altitude_ft: default_gear_check_altitude_ft(),
            gear_check_vs_fpm: default_gear_check_vs_fpm(),
            gear_penalty: default_gear_penalty(),
            max_bank_deg: default_max_bank_deg(),
            bank_penalty: default_bank_penalty(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { channel_capacity: default_channel_capacity() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> ScorerError {
    ScorerError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use flight_scorer::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.host.address.is_empty() {
            return Err(invalid("host address cannot be empty"));
        }

        if self.host.app_name.is_empty() {
            return Err(invalid("app_name cannot be empty"));
        }

        if self.host.connect_timeout_ms == 0 || self.host.connect_timeout_ms > 60000 {
            return Err(invalid("connect_timeout_ms must be between 1 and 60000"));
        }

        if self.host.retry_interval_ms == 0 || self.host.retry_interval_ms > 600_000 {
            return Err(invalid("retry_interval_ms must be between 1 and 600000"));
        }

        if self.scoring.cooldown_s == 0 || self.scoring.cooldown_s > MAX_COOLDOWN_S {
            return Err(invalid(format!("cooldown_s must be between 1 and {}", MAX_COOLDOWN_S)));
        }

        for (name, value) in [
            ("airborne_ground_speed_kt", self.scoring.airborne_ground_speed_kt),
            ("parked_ground_speed_kt", self.scoring.parked_ground_speed_kt),
            ("gear_check_vs_fpm", self.scoring.gear_check_vs_fpm),
        ] {
            if !value.is_finite() {
                return Err(invalid(format!("{} must be a finite number", name)));
            }
        }

        if !(self.scoring.glitch_threshold_nm > 0.0) {
            return Err(invalid("glitch_threshold_nm must be greater than 0"));
        }

        if self.scoring.parked_ground_speed_kt < 0.0
            || self.scoring.parked_ground_speed_kt >= self.scoring.airborne_ground_speed_kt
        {
            return Err(invalid(
                "parked_ground_speed_kt must be non-negative and below airborne_ground_speed_kt",
            ));
        }

        if self.scoring.lights_floor_ft >= self.scoring.lights_ceiling_ft {
            return Err(invalid("lights_floor_ft must be below lights_ceiling_ft"));
        }

        if self.scoring.gear_check_vs_fpm > 0.0 {
            return Err(invalid("gear_check_vs_fpm must be a descent rate (<= 0)"));
        }

        if self.scoring.max_bank_deg == 0 || self.scoring.max_bank_deg >= 180 {
            return Err(invalid("max_bank_deg must be between 1 and 179"));
        }

        for (name, value) in [
            ("lights_penalty", self.scoring.lights_penalty),
            ("gear_penalty", self.scoring.gear_penalty),
            ("bank_penalty", self.scoring.bank_penalty),
        ] {
            if value > 100 {
                return Err(invalid(format!("{} must be between 0 and 100", name)));
            }
        }

        if self.notifications.channel_capacity == 0 {
            return Err(invalid("channel_capacity must be greater than 0"));
        }

        if !["trace", "debug", "info", "warn", "error"]
            .contains(&self.logging.level.to_ascii_lowercase().as_str())
        {
            return Err(invalid("log level must be one of: trace, debug, info, warn, error"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[host]
address = "192.168.1.20:5557"
retry_interval_ms = 2500

[scoring]
bank_penalty = 3
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.host.address, "192.168.1.20:5557");
        assert_eq!(config.host.retry_interval(), Duration::from_millis(2500));
        assert_eq!(config.scoring.bank_penalty, 3);
        // Untouched sections fall back to defaults
        assert_eq!(config.scoring.gear_penalty, 10);
        assert_eq!(config.notifications.channel_capacity, 64);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.host.retry_interval_ms, 5000);
        assert_eq!(config.scoring.cooldown_s, 60);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/flight-scorer.toml");
        assert!(matches!(result, Err(ScorerError::Io(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let result = Config::from_toml_str("[host\naddress = ");
        assert!(matches!(result, Err(ScorerError::Config(_))));
    }

    #[test]
    fn test_empty_address() {
        let mut config = Config::default();
        config.host.address = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_interval_zero() {
        let mut config = Config::default();
        config.host.retry_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_connect_timeout_too_high() {
        let mut config = Config::default();
        config.host.connect_timeout_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cooldown_zero() {
        let mut config = Config::default();
        config.scoring.cooldown_s = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_glitch_threshold_nan() {
        let mut config = Config::default();
        config.scoring.glitch_threshold_nm = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parked_speed_above_airborne_speed() {
        let mut config = Config::default();
        config.scoring.parked_ground_speed_kt = 60.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_lights_band_inverted() {
        let mut config = Config::default();
        config.scoring.lights_floor_ft = 12000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_gear_check_vs_positive() {
        let mut config = Config::default();
        config.scoring.gear_check_vs_fpm = 100.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_penalty_too_large() {
        let mut config = Config::default();
        config.scoring.gear_penalty = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_channel_capacity_zero() {
        let mut config = Config::default();
        config.notifications.channel_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_host_address(), "127.0.0.1:5557");
        assert_eq!(default_retry_interval_ms(), 5000);
        assert_eq!(default_cooldown_s(), 60);
        assert_eq!(default_glitch_threshold_nm(), 10.0);
        assert_eq!(default_airborne_ground_speed_kt(), 50.0);
        assert_eq!(default_parked_ground_speed_kt(), 5.0);
        assert_eq!(default_lights_floor_ft(), 1000);
        assert_eq!(default_lights_ceiling_ft(), 10000);
        assert_eq!(default_lights_penalty(), 5);
        assert_eq!(default_gear_check_altitude_ft(), 1000);
        assert_eq!(default_gear_check_vs_fpm(), -100.0);
        assert_eq!(default_gear_penalty(), 10);
        assert_eq!(default_max_bank_deg(), 40);
        assert_eq!(default_bank_penalty(), 2);
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config = tokio_test::assert_ok!(Config::from_toml_str(include_str!("../config/default.toml")));
        let defaults = Config::default();

        assert_eq!(config.host.address, defaults.host.address);
        assert_eq!(config.host.retry_interval_ms, defaults.host.retry_interval_ms);
        assert_eq!(config.scoring.cooldown_s, defaults.scoring.cooldown_s);
        assert_eq!(config.scoring.lights_ceiling_ft, defaults.scoring.lights_ceiling_ft);
        assert_eq!(config.scoring.gear_penalty, defaults.scoring.gear_penalty);
        assert_eq!(config.notifications.channel_capacity, defaults.notifications.channel_capacity);
        assert!(config.logging.log_dir.is_none());
    }

    #[test]
    fn test_wrong_value_type() {
        tokio_test::assert_err!(Config::from_toml_str("[scoring]\ncooldown_s = \"sixty\"\n"));
    }

    #[test]
    fn test_cooldown_upper_bound() {
        let mut config = Config::default();
        config.scoring.cooldown_s = MAX_COOLDOWN_S;
        assert!(config.validate().is_ok());

        config.scoring.cooldown_s = 10_000_000_000_000_000;
        assert!(config.validate().is_err());
        tokio_test::assert_err!(Config::from_toml_str("[scoring]\ncooldown_s = 86401\n"));
    }

    #[test]
    fn test_non_finite_speed_thresholds() {
        let mut config = Config::default();
        config.scoring.airborne_ground_speed_kt = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scoring.parked_ground_speed_kt = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scoring.airborne_ground_speed_kt = f64::INFINITY;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scoring.gear_check_vs_fpm = f64::NEG_INFINITY;
        assert!(config.validate().is_err());
    }
}
