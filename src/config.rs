//! Publisher configuration.
//!
//! Every value is required. `from_env` reads `PUBLISHER_*` variables and
//! `from_json` accepts the same fields as a JSON document, with durations
//! expressed in milliseconds.

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

pub const ENV_PROJECT_ID: &str = "PUBLISHER_PROJECT_ID";
pub const ENV_TOPIC: &str = "PUBLISHER_TOPIC";
pub const ENV_MAX_BATCH: &str = "PUBLISHER_MAX_BATCH";
pub const ENV_MAX_PUBLISH_DELAY_MS: &str = "PUBLISHER_MAX_PUBLISH_DELAY_MS";
pub const ENV_MAX_WORKERS: &str = "PUBLISHER_MAX_WORKERS";
pub const ENV_WORKER_IDLE_MS: &str = "PUBLISHER_WORKER_IDLE_MS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherConfig {
    /// Broker project that owns the topic.
    pub project_id: String,
    /// Topic the batches are published to.
    pub topic: String,
    /// Message count that triggers a size flush.
    pub max_batch_size: usize,
    /// Longest a non-empty batch waits before a time flush.
    pub max_flush_delay: Duration,
    /// Upper bound on concurrently running publish tasks.
    pub max_workers: usize,
    /// Idle time after which a pool worker is reclaimed.
    pub worker_idle_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    project_id: String,
    topic: String,
    max_batch_size: usize,
    max_flush_delay_ms: u64,
    max_workers: usize,
    worker_idle_timeout_ms: u64,
}

impl PublisherConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup, using the env variable names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let millis = |key: &'static str| -> Result<Duration, ConfigError> {
            parse_value::<u64>(key, required(key)?).map(Duration::from_millis)
        };
        let count = |key: &'static str| -> Result<usize, ConfigError> {
            parse_value(key, required(key)?)
        };

        let config = Self {
            project_id: required(ENV_PROJECT_ID)?,
            topic: required(ENV_TOPIC)?,
            max_batch_size: count(ENV_MAX_BATCH)?,
            max_flush_delay: millis(ENV_MAX_PUBLISH_DELAY_MS)?,
            max_workers: count(ENV_MAX_WORKERS)?,
            worker_idle_timeout: millis(ENV_WORKER_IDLE_MS)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(contents)?;
        let config = Self {
            project_id: raw.project_id,
            topic: raw.topic,
            max_batch_size: raw.max_batch_size,
            max_flush_delay: Duration::from_millis(raw.max_flush_delay_ms),
            max_workers: raw.max_workers,
            worker_idle_timeout: Duration::from_millis(raw.worker_idle_timeout_ms),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project_id.trim().is_empty() {
            return Err(ConfigError::Missing("project_id"));
        }
        if self.topic.trim().is_empty() {
            return Err(ConfigError::Missing("topic"));
        }
        if self.max_batch_size == 0 {
            return Err(invalid("max_batch_size", self.max_batch_size));
        }
        if self.max_flush_delay.is_zero() {
            return Err(invalid("max_flush_delay", self.max_flush_delay.as_millis()));
        }
        if self.max_workers == 0 {
            return Err(invalid("max_workers", self.max_workers));
        }
        if self.worker_idle_timeout.is_zero() {
            return Err(invalid(
                "worker_idle_timeout",
                self.worker_idle_timeout.as_millis(),
            ));
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::Invalid { key, value })
}

fn invalid(key: &'static str, value: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
    }
}
