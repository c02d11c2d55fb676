//! Orchestrator configuration
//!
//! Precedence for every setting:
//! 1) explicit value set on [`DeliberationConfig`]
//! 2) env var (only through [`DeliberationConfig::from_env`])
//! 3) default

use serde::{Deserialize, Serialize};

pub const MAX_CONCURRENCY_ENV: &str = "DELIBERATORIUM_MAX_CONCURRENCY";

const DEFAULT_MAX_CONCURRENT_CLASSIFICATIONS: usize = 0;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("invalid {name}={value:?} (expected {expected})")]
    Invalid {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("failed to read {name}: {message}")]
    Unreadable { name: &'static str, message: String },
}

/// Configuration for assessment behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliberationConfig {
    /// Upper bound on classification calls in flight during one assessment.
    /// `0` dispatches every evidence item at once.
    pub max_concurrent_classifications: usize,
}

impl Default for DeliberationConfig {
    fn default() -> Self {
        Self {
            max_concurrent_classifications: DEFAULT_MAX_CONCURRENT_CLASSIFICATIONS,
        }
    }
}

impl DeliberationConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            max_concurrent_classifications: env_usize(
                MAX_CONCURRENCY_ENV,
                DEFAULT_MAX_CONCURRENT_CLASSIFICATIONS,
            )?,
        })
    }

    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrent_classifications = limit;
        self
    }
}

fn env_value(name: &'static str) -> Result<Option<String>, ConfigError> {
    match std::env::var(name) {
        Ok(v) => {
            let v = v.trim();
            if v.is_empty() {
                Ok(None)
            } else {
                Ok(Some(v.to_string()))
            }
        }
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::Unreadable {
            name,
            message: e.to_string(),
        }),
    }
}

pub(crate) fn env_usize(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    match env_value(name)? {
        None => Ok(default),
        Some(v) => v.parse::<usize>().map_err(|_| ConfigError::Invalid {
            name,
            value: v,
            expected: "non-negative integer",
        }),
    }
}

#[cfg_attr(not(feature = "openai"), allow(dead_code))]
pub(crate) fn env_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env_value(name)? {
        None => Ok(default),
        Some(v) => v.parse::<u64>().map_err(|_| ConfigError::Invalid {
            name,
            value: v,
            expected: "integer seconds; 0 disables",
        }),
    }
}
