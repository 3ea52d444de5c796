//! Attempt failures, their classification and decoration

use std::error::Error;
use std::fmt;

use crate::abort::{AbortError, AbortReason};
use crate::predicate::NetworkErrorPredicate;

/// How an action reports a failed attempt
///
/// Plain errors convert into [`AttemptError::Transient`], so `?` inside an
/// action marks a failure as retryable.
#[derive(Debug)]
pub enum AttemptError<E> {
    /// A failure that may go away on retry
    Transient(E),

    /// A bug in the caller (bad input, wrong type); never retried unless the
    /// network-error predicate recognises it
    Programmer(E),

    /// Stop retrying and surface the abort's original error
    Abort(AbortError<E>),

    /// Something that is not an error was raised
    NonError(String),
}

impl<E> From<E> for AttemptError<E> {
    fn from(error: E) -> Self {
        AttemptError::Transient(error)
    }
}

impl<E> AttemptError<E> {
    /// Create a transient failure
    pub fn transient(error: E) -> Self {
        AttemptError::Transient(error)
    }

    /// Create a programmer error
    pub fn programmer(error: E) -> Self {
        AttemptError::Programmer(error)
    }

    /// Abort with a message
    #[track_caller]
    pub fn abort(message: impl Into<String>) -> Self {
        AttemptError::Abort(AbortError::new(message))
    }

    /// Abort with an existing error
    pub fn abort_with(error: E) -> Self
    where
        E: fmt::Display,
    {
        AttemptError::Abort(AbortError::from_error(error))
    }

    /// Report a raised value that is not an error
    pub fn non_error(value: impl fmt::Display) -> Self {
        AttemptError::NonError(value.to_string())
    }
}

impl<E> From<AbortError<E>> for AttemptError<E> {
    fn from(abort: AbortError<E>) -> Self {
        AttemptError::Abort(abort)
    }
}

/// A transient failure decorated with attempt counters
///
/// Built by [`decorate`] after each retryable failure and handed to
/// observers and the `on_failed_attempt` hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedAttempt<E> {
    error: E,
    attempt_number: u32,
    retries_left: u32,
}

impl<E> FailedAttempt<E> {
    /// The error the attempt failed with
    pub fn error(&self) -> &E {
        &self.error
    }

    /// 1-based number of the attempt that failed
    pub fn attempt_number(&self) -> u32 {
        self.attempt_number
    }

    /// Retries remaining in the budget when this attempt failed
    pub fn retries_left(&self) -> u32 {
        self.retries_left
    }

    /// Unwrap the original error
    pub fn into_error(self) -> E {
        self.error
    }
}

impl<E: fmt::Display> fmt::Display for FailedAttempt<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attempt {} failed ({} retries left): {}",
            self.attempt_number, self.retries_left, self.error
        )
    }
}

impl<E: Error + 'static> Error for FailedAttempt<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

/// Attach attempt counters to an error
///
/// `retries_left` is `retries - (attempt_number - 1)`: the first attempt
/// does not count as a retry.
pub fn decorate<E>(error: E, attempt_number: u32, retries: u32) -> FailedAttempt<E> {
    FailedAttempt {
        error,
        attempt_number,
        retries_left: retries.saturating_sub(attempt_number.saturating_sub(1)),
    }
}

/// Outcome of one attempt after classification
#[derive(Debug)]
pub(crate) enum Classified<T, E> {
    Success(T),
    NonError(String),
    Abort(AbortReason<E>),
    Programmer(E),
    Transient(E),
}

/// Sort an attempt's result into exactly one outcome
///
/// Programmer errors the network predicate recognises are downgraded to
/// transient failures.
pub(crate) fn classify<T, E>(
    result: Result<T, AttemptError<E>>,
    network_error: &dyn NetworkErrorPredicate<E>,
) -> Classified<T, E> {
    match result {
        Ok(value) => Classified::Success(value),
        Err(AttemptError::NonError(value)) => Classified::NonError(value),
        Err(AttemptError::Abort(abort)) => Classified::Abort(abort.into_reason()),
        Err(AttemptError::Programmer(error)) if network_error.is_network_error(&error) => {
            Classified::Transient(error)
        }
        Err(AttemptError::Programmer(error)) => Classified::Programmer(error),
        Err(AttemptError::Transient(error)) => Classified::Transient(error),
    }
}
