//! Typed configuration from environment variables.
//!
//! Every value has a sane default; overrides are read once at startup and
//! fail fast when unparseable.

use std::time::Duration;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// How long an idempotency entry lives before the sweeper may evict it.
    pub key_ttl: Duration,

    /// How often the background sweeper runs. Kept independent of the TTL;
    /// should be materially shorter than it to bound staleness.
    pub sweep_interval: Duration,

    /// Simulated latency of the downstream payment processor.
    pub processing_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            key_ttl: Duration::from_secs(24 * 60 * 60),
            sweep_interval: Duration::from_secs(10 * 60),
            processing_delay: Duration::from_secs(2),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to the
    /// defaults above.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            key_ttl: secs_var("IDEMGATE_KEY_TTL_SECS", defaults.key_ttl)?,
            sweep_interval: secs_var("IDEMGATE_SWEEP_INTERVAL_SECS", defaults.sweep_interval)?,
            processing_delay: millis_var(
                "IDEMGATE_PROCESSING_DELAY_MS",
                defaults.processing_delay,
            )?,
        })
    }
}

fn secs_var(name: &str, default: Duration) -> Result<Duration> {
    match std::env::var(name) {
        Ok(raw) => raw.parse::<u64>().map(Duration::from_secs).map_err(|_| {
            Error::Config(format!(
                "{name} must be an integer number of seconds, got {raw:?}"
            ))
        }),
        Err(_) => Ok(default),
    }
}

fn millis_var(name: &str, default: Duration) -> Result<Duration> {
    match std::env::var(name) {
        Ok(raw) => raw.parse::<u64>().map(Duration::from_millis).map_err(|_| {
            Error::Config(format!(
                "{name} must be an integer number of milliseconds, got {raw:?}"
            ))
        }),
        Err(_) => Ok(default),
    }
}
