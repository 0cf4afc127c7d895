//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every field carries a default, so a partial file (or an empty one)
//! yields a runnable configuration against a local target.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::types::BenchError;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub target: TargetConfig,
    pub limits: LimitsConfig,
    pub timeouts: TimeoutsConfig,
    pub prefetch: PrefetchConfig,
    pub run: RunConfig,
}

/// Endpoints of the system under test and its satellite services.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TargetConfig {
    /// The exchange app investors talk to.
    pub app_endpoint: String,
    /// Bank endpoint handed to the app on initialize.
    pub bank_endpoint: String,
    /// Log endpoint handed to the app on initialize.
    pub log_endpoint: String,
    /// Privileged bank endpoint used to register identities and add credit.
    pub internal_bank_endpoint: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            app_endpoint: "http://localhost:12510".to_string(),
            bank_endpoint: "http://localhost:5515".to_string(),
            log_endpoint: "http://localhost:5516".to_string(),
            internal_bank_endpoint: "http://localhost:5515".to_string(),
        }
    }
}

/// Error budget and batch sizing.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Floor of the dynamic error limit, and the hard gate on level-ups.
    pub allow_error_min: i64,
    /// Ceiling of the dynamic error limit.
    pub allow_error_max: i64,
    /// Investors created by `start()` and by each level-up.
    pub add_workers_by_level: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            allow_error_min: 50,
            allow_error_max: 200,
            add_workers_by_level: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct TimeoutsConfig {
    /// Per-request timeout for investor clients.
    pub client_timeout_ms: u64,
    /// Requests slower than this retire the investor.
    pub retire_timeout_ms: u64,
    /// Timeout for the bootstrap client's initialize call.
    pub init_timeout_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            client_timeout_ms: 5_000,
            retire_timeout_ms: 10_000,
            init_timeout_ms: 30_000,
        }
    }
}

impl TimeoutsConfig {
    pub fn client_timeout(&self) -> Duration {
        Duration::from_millis(self.client_timeout_ms)
    }

    pub fn retire_timeout(&self) -> Duration {
        Duration::from_millis(self.retire_timeout_ms)
    }

    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct PrefetchConfig {
    /// Ready identities buffered ahead of demand.
    pub capacity: usize,
    /// Pause after a failed ledger registration before trying a new token.
    pub retry_delay_ms: u64,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            retry_delay_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct RunConfig {
    /// Wall-clock length of the load phase.
    pub duration_secs: u64,
    /// Controller tick period.
    pub tick_interval_ms: u64,
    /// How long in-flight tasks get to finish after the run ends.
    pub shutdown_grace_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            duration_secs: 60,
            tick_interval_ms: 1_000,
            shutdown_grace_ms: 5_000,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Invalid config file: {path}"))
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(contents).context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject combinations the engine cannot run with.
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.limits.allow_error_min > self.limits.allow_error_max {
            return Err(BenchError::Config(format!(
                "allow_error_min ({}) exceeds allow_error_max ({})",
                self.limits.allow_error_min, self.limits.allow_error_max
            )));
        }
        if self.limits.allow_error_max <= 0 {
            return Err(BenchError::Config("allow_error_max must be positive".into()));
        }
        if self.limits.add_workers_by_level == 0 {
            return Err(BenchError::Config("add_workers_by_level must be positive".into()));
        }
        if self.prefetch.capacity == 0 {
            return Err(BenchError::Config("prefetch capacity must be positive".into()));
        }
        if self.run.tick_interval_ms == 0 {
            return Err(BenchError::Config("tick_interval_ms must be positive".into()));
        }
        Ok(())
    }
}
