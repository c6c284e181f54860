//! Notification pump timing.
//!
//! The pump polls fast while things are changing and backs off while idle.
//! All four numbers can be set in code or read from a TOML `[pump]` table.
//!
//! # Example
//!
//! ```ignore
//! use procstate_core::PumpConfig;
//!
//! pub const PUMP: PumpConfig = PumpConfig::new()
//!     .with_fast_interval_ms(10)
//!     .with_idle_ceiling_ms(250);
//!
//! let from_file = PumpConfig::from_toml_str(r#"
//!     [pump]
//!     idle_floor_ms = 40
//! "#)?;
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Scheduling parameters for the [`NotificationPump`](crate::NotificationPump).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PumpConfig {
    /// Interval after a tick that dispatched something (default 20 ms, 50 Hz).
    pub fast_interval_ms: u64,
    /// Lower bound of the idle interval (default 50 ms).
    pub idle_floor_ms: u64,
    /// Upper bound of the idle interval (default 500 ms).
    pub idle_ceiling_ms: u64,
    /// Growth of the interval per idle tick (default 20 ms).
    pub idle_step_ms: u64,
}

/// Top-level shape of a config file; only `[pump]` is read.
#[derive(Deserialize)]
struct ConfigFile {
    #[serde(default)]
    pump: PumpConfig,
}

impl PumpConfig {
    /// Default timing.
    pub const fn new() -> Self {
        Self {
            fast_interval_ms: 20,
            idle_floor_ms: 50,
            idle_ceiling_ms: 500,
            idle_step_ms: 20,
        }
    }

    /// Set the interval used after activity.
    pub const fn with_fast_interval_ms(mut self, ms: u64) -> Self {
        self.fast_interval_ms = ms;
        self
    }

    /// Set the idle floor.
    pub const fn with_idle_floor_ms(mut self, ms: u64) -> Self {
        self.idle_floor_ms = ms;
        self
    }

    /// Set the idle ceiling.
    pub const fn with_idle_ceiling_ms(mut self, ms: u64) -> Self {
        self.idle_ceiling_ms = ms;
        self
    }

    /// Set the per-tick idle growth.
    pub const fn with_idle_step_ms(mut self, ms: u64) -> Self {
        self.idle_step_ms = ms;
        self
    }

    /// Parse the `[pump]` table of a TOML document and validate it.
    ///
    /// Missing keys (or a missing table) keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(source)?;
        file.pump.validate()?;
        Ok(file.pump)
    }

    /// Check that the intervals are non-zero and the idle bounds are ordered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fast_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "fast_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.idle_floor_ms == 0 {
            return Err(ConfigError::Invalid(
                "idle_floor_ms must be greater than zero".to_string(),
            ));
        }
        if self.idle_floor_ms > self.idle_ceiling_ms {
            return Err(ConfigError::Invalid(format!(
                "idle_floor_ms ({}) must not exceed idle_ceiling_ms ({})",
                self.idle_floor_ms, self.idle_ceiling_ms
            )));
        }
        Ok(())
    }

    /// Fast interval as a [`Duration`].
    pub const fn fast_interval(&self) -> Duration {
        Duration::from_millis(self.fast_interval_ms)
    }

    /// Idle floor as a [`Duration`].
    pub const fn idle_floor(&self) -> Duration {
        Duration::from_millis(self.idle_floor_ms)
    }

    /// Idle ceiling as a [`Duration`].
    pub const fn idle_ceiling(&self) -> Duration {
        Duration::from_millis(self.idle_ceiling_ms)
    }

    /// Idle step as a [`Duration`].
    pub const fn idle_step(&self) -> Duration {
        Duration::from_millis(self.idle_step_ms)
    }
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self::new()
    }
}
