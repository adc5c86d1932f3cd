//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::dshot::command::CommandRepeat;
use crate::error::{EscError, Result};
use crate::esc::protocol::Protocol;
use crate::hal::MAX_PIN;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub esc: EscConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub commands: CommandConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Startup defaults used when nothing is persisted
#[derive(Debug, Deserialize, Clone)]
pub struct EscConfig {
    #[serde(default = "default_pin")]
    pub default_pin: u8,

    #[serde(default = "default_protocol")]
    pub default_protocol: Protocol,
}

/// Control loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ControlConfig {
    #[serde(default = "default_loop_rate_hz")]
    pub loop_rate_hz: u32,
}

/// Special command repetition
#[derive(Debug, Deserialize, Clone)]
pub struct CommandConfig {
    #[serde(default = "default_repeat_count")]
    pub repeat_count: u8,

    #[serde(default = "default_repeat_interval_ms")]
    pub repeat_interval_ms: u64,
}

/// Settings persistence
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Empty = log to stderr only
    #[serde(default)]
    pub directory: String,
}

// Default value functions
fn default_pin() -> u8 { 5 }
fn default_protocol() -> Protocol { Protocol::Pwm }

fn default_loop_rate_hz() -> u32 { 50 }

fn default_repeat_count() -> u8 { 10 }
fn default_repeat_interval_ms() -> u64 { 1 }

fn default_store_path() -> String { "esc_settings.toml".to_string() }

fn default_log_level() -> String { "info".to_string() }

impl Default for EscConfig {
    fn default() -> Self {
        Self {
            default_pin: default_pin(),
            default_protocol: default_protocol(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            loop_rate_hz: default_loop_rate_hz(),
        }
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            repeat_count: default_repeat_count(),
            repeat_interval_ms: default_repeat_interval_ms(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
        }
    }
}

impl ControlConfig {
    /// Tick period derived from the loop rate
    pub fn period(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.loop_rate_hz.max(1)))
    }
}

impl CommandConfig {
    /// Repetition policy for special commands
    pub fn repeat_policy(&self) -> CommandRepeat {
        CommandRepeat::new(self.repeat_count, Duration::from_millis(self.repeat_interval_ms))
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
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
    /// use esc_driver::config::Config;
    ///
    /// let config = Config::load("config/esc-driver.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.esc.default_pin > MAX_PIN {
            return Err(invalid(format!("default_pin must be between 0 and {}", MAX_PIN)));
        }

        if self.control.loop_rate_hz == 0 || self.control.loop_rate_hz > 1000 {
            return Err(invalid("loop_rate_hz must be between 1 and 1000"));
        }

        if self.commands.repeat_count == 0 || self.commands.repeat_count > 100 {
            return Err(invalid("repeat_count must be between 1 and 100"));
        }

        if self.commands.repeat_interval_ms > 1000 {
            return Err(invalid("repeat_interval_ms must be between 0 and 1000"));
        }

        if self.store.path.is_empty() {
            return Err(invalid("store path cannot be empty"));
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid("log level must be one of: trace, debug, info, warn, error"));
        }

        Ok(())
    }
}

fn invalid(msg: impl std::fmt::Display) -> EscError {
    EscError::Config(toml::de::Error::custom(msg))
}
