//! Error types for retried-backoff

use thiserror::Error;

/// Result type alias using retried-backoff's error type
pub type Result<T> = std::result::Result<T, BackoffError>;

/// Errors raised while turning a [`BackoffPolicy`](crate::BackoffPolicy)
/// into an operation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackoffError {
    /// The smallest delay is larger than the largest one
    #[error("min-timeout ({min_timeout_ms}ms) is greater than max-timeout ({max_timeout_ms}ms)")]
    MinTimeoutExceedsMax {
        min_timeout_ms: u64,
        max_timeout_ms: u64,
    },

    /// The backoff factor cannot produce a usable delay
    #[error("invalid backoff factor: {factor} (must be finite and positive)")]
    InvalidFactor { factor: f64 },
}

impl BackoffError {
    /// Create a min/max timeout mismatch error
    pub fn min_timeout_exceeds_max(min_timeout_ms: u64, max_timeout_ms: u64) -> Self {
        Self::MinTimeoutExceedsMax {
            min_timeout_ms,
            max_timeout_ms,
        }
    }

    /// Create an invalid factor error
    pub fn invalid_factor(factor: f64) -> Self {
        Self::InvalidFactor { factor }
    }
}
