//! Error types for the retry controller
//!
//! Every way a retry session can end badly maps to exactly one
//! [`RetryError`] variant.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use retried_backoff::BackoffError;

use crate::abort::AbortReason;

/// Errors that end a retry session
///
/// The error type is generic over `E`, the error type of the action being
/// retried.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The action raised something that is not an error
    NonError {
        /// Attempt that raised it
        attempt: u32,
        /// String form of the raised value
        value: String,
    },

    /// The action asked to stop retrying
    ///
    /// Displays as the original error.
    Aborted {
        /// Attempt that aborted
        attempt: u32,
        /// The original error carried by the abort
        reason: AbortReason<E>,
    },

    /// The action failed with a programmer error
    ///
    /// Displays as the original error.
    Programmer {
        /// Attempt that failed
        attempt: u32,
        /// The error the action returned
        source: E,
    },

    /// The `on_failed_attempt` hook failed
    ///
    /// Displays as the hook's error.
    Hook {
        /// Attempt whose failure was being reported
        attempt: u32,
        /// The hook's error
        source: anyhow::Error,
    },

    /// The backoff operation refused another attempt
    Exhausted {
        /// Number of attempts made before giving up
        attempts: u32,
        /// The operation's main error
        source: E,
        /// Total duration of the session
        total_duration: Duration,
    },

    /// The backoff operation's retry-time budget elapsed
    TimedOut {
        /// Number of attempts made before giving up
        attempts: u32,
        /// The operation's main error
        source: E,
        /// Total duration of the session
        total_duration: Duration,
    },

    /// The backoff operation refused another attempt without recording an
    /// error
    Cancelled {
        /// Number of attempts made
        attempts: u32,
    },

    /// The backoff policy could not be turned into an operation
    InvalidPolicy(BackoffError),
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::NonError { value, .. } => {
                write!(
                    f,
                    "Non-error was thrown: \"{}\". You should only throw errors.",
                    value
                )
            }
            RetryError::Aborted { reason, .. } => write!(f, "{}", reason),
            RetryError::Programmer { source, .. } => write!(f, "{}", source),
            RetryError::Hook { source, .. } => write!(f, "{}", source),
            RetryError::Exhausted {
                attempts,
                source,
                total_duration,
            } => {
                write!(
                    f,
                    "retry exhausted after {} attempts over {:.2}s: {}",
                    attempts,
                    total_duration.as_secs_f64(),
                    source
                )
            }
            RetryError::TimedOut {
                attempts,
                source,
                total_duration,
            } => {
                write!(
                    f,
                    "retry time limit reached after {} attempts over {:.2}s: {}",
                    attempts,
                    total_duration.as_secs_f64(),
                    source
                )
            }
            RetryError::Cancelled { attempts } => {
                write!(f, "retry cancelled after {} attempts", attempts)
            }
            RetryError::InvalidPolicy(err) => write!(f, "invalid backoff policy: {}", err),
        }
    }
}

impl<E: Error + 'static> Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            // These display as the wrapped error, so skip straight past it
            RetryError::Aborted { reason, .. } => reason.source(),
            RetryError::Programmer { source, .. } => source.source(),
            RetryError::Hook { source, .. } => source.source(),
            RetryError::Exhausted { source, .. } => Some(source),
            RetryError::TimedOut { source, .. } => Some(source),
            RetryError::InvalidPolicy(err) => Some(err),
            RetryError::NonError { .. } | RetryError::Cancelled { .. } => None,
        }
    }
}

impl<E> From<BackoffError> for RetryError<E> {
    fn from(err: BackoffError) -> Self {
        RetryError::InvalidPolicy(err)
    }
}

impl<E> RetryError<E> {
    /// Get the number of attempts made
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::NonError { attempt, .. }
            | RetryError::Aborted { attempt, .. }
            | RetryError::Programmer { attempt, .. }
            | RetryError::Hook { attempt, .. } => *attempt,
            RetryError::Exhausted { attempts, .. }
            | RetryError::TimedOut { attempts, .. }
            | RetryError::Cancelled { attempts } => *attempts,
            RetryError::InvalidPolicy(_) => 0,
        }
    }

    /// Check if the retry budget was spent
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. } | RetryError::TimedOut { .. })
    }

    /// Check if the retry-time budget elapsed
    pub fn is_timeout(&self) -> bool {
        matches!(self, RetryError::TimedOut { .. })
    }

    /// Check if the action aborted
    pub fn is_aborted(&self) -> bool {
        matches!(self, RetryError::Aborted { .. })
    }

    /// Check if the action failed with a programmer error
    pub fn is_programmer(&self) -> bool {
        matches!(self, RetryError::Programmer { .. })
    }

    /// Check if the action raised a non-error value
    pub fn is_non_error(&self) -> bool {
        matches!(self, RetryError::NonError { .. })
    }

    /// Check if the `on_failed_attempt` hook failed
    pub fn is_hook_failure(&self) -> bool {
        matches!(self, RetryError::Hook { .. })
    }

    /// Check if the backoff operation was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled { .. })
    }

    /// Get the action's error, consuming this error
    ///
    /// Aborts built from a plain message carry no action error.
    pub fn into_source(self) -> Option<E> {
        match self {
            RetryError::Aborted { reason, .. } => reason.into_error(),
            RetryError::Programmer { source, .. }
            | RetryError::Exhausted { source, .. }
            | RetryError::TimedOut { source, .. } => Some(source),
            RetryError::NonError { .. }
            | RetryError::Hook { .. }
            | RetryError::Cancelled { .. }
            | RetryError::InvalidPolicy(_) => None,
        }
    }

    /// Get a reference to the action's error
    pub fn source_ref(&self) -> Option<&E> {
        match self {
            RetryError::Aborted { reason, .. } => reason.error(),
            RetryError::Programmer { source, .. }
            | RetryError::Exhausted { source, .. }
            | RetryError::TimedOut { source, .. } => Some(source),
            RetryError::NonError { .. }
            | RetryError::Hook { .. }
            | RetryError::Cancelled { .. }
            | RetryError::InvalidPolicy(_) => None,
        }
    }

    /// Map the action's error type using a closure
    pub fn map_err<F, E2>(self, f: F) -> RetryError<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            RetryError::NonError { attempt, value } => RetryError::NonError { attempt, value },
            RetryError::Aborted { attempt, reason } => RetryError::Aborted {
                attempt,
                reason: reason.map_err(f),
            },
            RetryError::Programmer { attempt, source } => RetryError::Programmer {
                attempt,
                source: f(source),
            },
            RetryError::Hook { attempt, source } => RetryError::Hook { attempt, source },
            RetryError::Exhausted {
                attempts,
                source,
                total_duration,
            } => RetryError::Exhausted {
                attempts,
                source: f(source),
                total_duration,
            },
            RetryError::TimedOut {
                attempts,
                source,
                total_duration,
            } => RetryError::TimedOut {
                attempts,
                source: f(source),
                total_duration,
            },
            RetryError::Cancelled { attempts } => RetryError::Cancelled { attempts },
            RetryError::InvalidPolicy(err) => RetryError::InvalidPolicy(err),
        }
    }
}
