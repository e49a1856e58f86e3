//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `tripwire.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use serde::Deserialize;
use tripwire_app::scheduler::SchedulerConfig;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Timer scheduler settings.
    pub scheduler: SchedulerSection,
    /// Device cache settings.
    pub devices: DevicesConfig,
    /// Integration toggles.
    pub integrations: IntegrationsConfig,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Timer scheduler configuration, in milliseconds.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    /// Delay before the first immediate fire of every timer.
    pub bootstrap_delay_ms: u64,
    /// Shortest period a timer may tick at.
    pub min_interval_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DevicesConfig {
    /// Period of the full device reload.
    pub reload_interval_minutes: u64,
}

/// Per-integration toggles.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IntegrationsConfig {
    /// Enable the virtual/demo hub.
    pub virtual_enabled: bool,
}

impl Config {
    /// Load configuration from `tripwire.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if a
    /// value fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("tripwire.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    /// Apply overrides read through `lookup`; unparsable numbers are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("TRIPWIRE_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = lookup("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(ms) = lookup("TRIPWIRE_BOOTSTRAP_DELAY_MS").and_then(|v| v.parse().ok()) {
            self.scheduler.bootstrap_delay_ms = ms;
        }
        if let Some(ms) = lookup("TRIPWIRE_MIN_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            self.scheduler.min_interval_ms = ms;
        }
        if let Some(minutes) =
            lookup("TRIPWIRE_RELOAD_INTERVAL_MINUTES").and_then(|v| v.parse().ok())
        {
            self.devices.reload_interval_minutes = minutes;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.min_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "scheduler.min_interval_ms must be non-zero".to_string(),
            ));
        }
        if self.devices.reload_interval_minutes == 0 {
            return Err(ConfigError::Validation(
                "devices.reload_interval_minutes must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Timing knobs handed to the timer scheduler.
    #[must_use]
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            bootstrap_delay: Duration::from_millis(self.scheduler.bootstrap_delay_ms),
            min_interval: Duration::from_millis(self.scheduler.min_interval_ms),
        }
    }

    #[must_use]
    pub fn reload_interval(&self) -> Duration {
        Duration::from_secs(self.devices.reload_interval_minutes.saturating_mul(60))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "tripwired=info,tripwire=info".to_string(),
        }
    }
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            bootstrap_delay_ms: 500,
            min_interval_ms: 50,
        }
    }
}

impl Default for DevicesConfig {
    fn default() -> Self {
        Self {
            reload_interval_minutes: 15,
        }
    }
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self {
            virtual_enabled: true,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
