//! Configuration loading and representation.
//!
//! Loads engine settings from environment variables with defaults. Values that
//! are present but unparsable are reported instead of silently replaced.

use std::time::Duration;

use thiserror::Error;

pub const ENV_RESERVATION_TTL_SECS: &str = "STOCKHOLD_RESERVATION_TTL_SECS";
pub const ENV_SWEEP_INTERVAL_SECS: &str = "STOCKHOLD_SWEEP_INTERVAL_SECS";
pub const ENV_MAX_ATTEMPTS: &str = "STOCKHOLD_MAX_ATTEMPTS";

/// Ten years; anything longer is almost certainly a unit mistake.
const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var}={value:?} is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Reservation engine and sweeper settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// How long a reservation stays PENDING before it lapses.
    pub reservation_ttl: Duration,
    /// Period of the background expiry sweep.
    pub sweep_interval: Duration,
    /// Optimistic retry budget per operation.
    pub max_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reservation_ttl: Duration::from_secs(5 * 60),
            sweep_interval: Duration::from_secs(60),
            max_attempts: 3,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let reservation_ttl = match lookup(ENV_RESERVATION_TTL_SECS) {
            Some(raw) => Duration::from_secs(parse_secs(ENV_RESERVATION_TTL_SECS, &raw)?),
            None => defaults.reservation_ttl,
        };
        let sweep_interval = match lookup(ENV_SWEEP_INTERVAL_SECS) {
            Some(raw) => Duration::from_secs(parse_secs(ENV_SWEEP_INTERVAL_SECS, &raw)?),
            None => defaults.sweep_interval,
        };
        let max_attempts = match lookup(ENV_MAX_ATTEMPTS) {
            Some(raw) => parse_attempts(&raw)?,
            None => defaults.max_attempts,
        };

        Ok(Self {
            reservation_ttl,
            sweep_interval,
            max_attempts,
        })
    }

    pub fn with_reservation_ttl(mut self, ttl: Duration) -> Self {
        self.reservation_ttl = ttl;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }
}

fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_secs(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| invalid(var, raw, e.to_string()))?;
    if secs == 0 {
        return Err(invalid(var, raw, "must be at least 1 second"));
    }
    if secs > MAX_DURATION_SECS {
        return Err(invalid(var, raw, "must not exceed ten years"));
    }
    Ok(secs)
}

fn parse_attempts(raw: &str) -> Result<u32, ConfigError> {
    let attempts: u32 = raw
        .trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| invalid(ENV_MAX_ATTEMPTS, raw, e.to_string()))?;
    if attempts == 0 {
        return Err(invalid(ENV_MAX_ATTEMPTS, raw, "must be at least 1"));
    }
    Ok(attempts)
}
