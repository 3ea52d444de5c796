//! Backoff policy types
//!
//! A [`BackoffPolicy`] describes how many retries an operation may make and
//! how long to wait between them. It is plain data so it can be embedded in
//! any configuration file the caller already parses.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{BackoffError, Result};

/// Retry budget and delay parameters for a backoff operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BackoffPolicy {
    /// Maximum number of retries after the first attempt
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Shape of the delay curve
    #[serde(default)]
    pub strategy: BackoffStrategy,

    /// Growth factor for exponential backoff
    #[serde(default = "default_factor")]
    pub factor: f64,

    /// Delay before the first retry, in milliseconds
    #[serde(default = "default_min_timeout")]
    pub min_timeout_ms: u64,

    /// Upper bound for any single delay, in milliseconds (unbounded if unset)
    #[serde(default)]
    pub max_timeout_ms: Option<u64>,

    /// Multiply each delay by a random factor in `[1, 2)`
    #[serde(default)]
    pub randomize: bool,

    /// Keep retrying with the last delay once the budget is spent
    #[serde(default)]
    pub forever: bool,

    /// Stop retrying once this much time has passed since the first attempt
    #[serde(default)]
    pub max_retry_time_ms: Option<u64>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            strategy: BackoffStrategy::default(),
            factor: default_factor(),
            min_timeout_ms: default_min_timeout(),
            max_timeout_ms: None,
            randomize: false,
            forever: false,
            max_retry_time_ms: None,
        }
    }
}

fn default_retries() -> u32 {
    10
}
fn default_factor() -> f64 {
    2.0
}
fn default_min_timeout() -> u64 {
    1000 // 1 second
}

impl BackoffPolicy {
    /// Policy with the given retry budget and default delays
    pub fn with_retries(retries: u32) -> Self {
        Self {
            retries,
            ..Self::default()
        }
    }

    /// Check that the delay parameters are consistent
    pub fn validate(&self) -> Result<()> {
        if !self.factor.is_finite() || self.factor <= 0.0 {
            return Err(BackoffError::invalid_factor(self.factor));
        }

        if let Some(max_timeout_ms) = self.max_timeout_ms {
            if self.min_timeout_ms > max_timeout_ms {
                return Err(BackoffError::min_timeout_exceeds_max(
                    self.min_timeout_ms,
                    max_timeout_ms,
                ));
            }
        }

        Ok(())
    }

    /// Delay cap as a duration, if any
    pub fn max_timeout(&self) -> Option<Duration> {
        self.max_timeout_ms.map(Duration::from_millis)
    }

    /// Total retry time budget as a duration, if any
    pub fn max_retry_time(&self) -> Option<Duration> {
        self.max_retry_time_ms.map(Duration::from_millis)
    }
}

/// Shape of the delay curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BackoffStrategy {
    /// Retry immediately
    None,

    /// Same delay between every attempt
    Fixed,

    /// Delay grows by `min-timeout` each retry
    Linear,

    /// Delay is multiplied by `factor` each retry (default)
    #[default]
    Exponential,
}
