//! Retry observation and logging
//!
//! This module provides the `RetryObserver` trait for monitoring a retry
//! session and a `TracingObserver` implementation that logs using the
//! `tracing` crate.

use std::error::Error;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Observer trait for retry session events
///
/// Observers see every event but cannot influence the session; use the
/// `on_failed_attempt` hook for that.
///
/// # Example
///
/// ```rust
/// use retried_core::RetryObserver;
/// use std::error::Error;
/// use std::time::Duration;
///
/// struct MetricsObserver;
///
/// impl RetryObserver for MetricsObserver {
///     fn on_attempt_start(&self, attempt: u32, retries: u32) {}
///
///     fn on_attempt_failed(&self, attempt: u32, retries_left: u32, error: &dyn Error) {}
///
///     fn on_success(&self, attempt: u32, total_duration: Duration) {}
///
///     fn on_exhausted(&self, attempts: u32, main_error: &dyn Error) {}
/// }
/// ```
pub trait RetryObserver: Send + Sync {
    /// Called when an attempt is about to start
    ///
    /// # Arguments
    ///
    /// * `attempt` - The attempt number (1-indexed)
    /// * `retries` - The retry budget of the session
    fn on_attempt_start(&self, attempt: u32, retries: u32);

    /// Called when an attempt fails with a retryable error
    ///
    /// Runs before the `on_failed_attempt` hook.
    fn on_attempt_failed(&self, attempt: u32, retries_left: u32, error: &dyn Error);

    /// Called when the backoff operation schedules another attempt
    ///
    /// # Arguments
    ///
    /// * `next_attempt` - The attempt number that will run next
    /// * `delay` - The delay before it runs
    fn on_retry_scheduled(&self, next_attempt: u32, delay: Duration) {
        let _ = (next_attempt, delay);
    }

    /// Called when the action succeeds
    fn on_success(&self, attempt: u32, total_duration: Duration);

    /// Called when the backoff operation refuses another attempt
    fn on_exhausted(&self, attempts: u32, main_error: &dyn Error);

    /// Called when the session stops early
    ///
    /// This covers aborts, programmer errors, non-error values and hook
    /// failures.
    fn on_aborted(&self, attempt: u32, error: Option<&dyn Error>) {
        let _ = (attempt, error);
    }
}

/// A no-op observer that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl RetryObserver for NoOpObserver {
    fn on_attempt_start(&self, _attempt: u32, _retries: u32) {}

    fn on_attempt_failed(&self, _attempt: u32, _retries_left: u32, _error: &dyn Error) {}

    fn on_success(&self, _attempt: u32, _total_duration: Duration) {}

    fn on_exhausted(&self, _attempts: u32, _main_error: &dyn Error) {}
}

/// An observer that logs retry events using the `tracing` crate
///
/// # Log Levels
///
/// - `on_attempt_start`: DEBUG
/// - `on_attempt_failed`: WARN
/// - `on_retry_scheduled`: DEBUG
/// - `on_success`: INFO (if > 1 attempt) or DEBUG (first attempt)
/// - `on_exhausted`: ERROR
/// - `on_aborted`: WARN
///
/// # Example
///
/// ```rust
/// use retried_core::TracingObserver;
///
/// let observer = TracingObserver::new("fetch-unicorn");
/// assert_eq!(observer.operation(), "fetch-unicorn");
/// ```
#[derive(Debug, Clone)]
pub struct TracingObserver {
    /// Name of the operation being retried (for log context)
    operation: String,
}

impl TracingObserver {
    /// Create a new tracing observer
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }

    /// Get the operation name
    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new("retry")
    }
}

impl RetryObserver for TracingObserver {
    fn on_attempt_start(&self, attempt: u32, retries: u32) {
        tracing::debug!(
            operation = %self.operation,
            attempt = attempt,
            retries = retries,
            "starting attempt"
        );
    }

    fn on_attempt_failed(&self, attempt: u32, retries_left: u32, error: &dyn Error) {
        tracing::warn!(
            operation = %self.operation,
            attempt = attempt,
            retries_left = retries_left,
            error = %error,
            "attempt failed"
        );
    }

    fn on_retry_scheduled(&self, next_attempt: u32, delay: Duration) {
        tracing::debug!(
            operation = %self.operation,
            next_attempt = next_attempt,
            delay_ms = delay.as_millis() as u64,
            "retry scheduled"
        );
    }

    fn on_success(&self, attempt: u32, total_duration: Duration) {
        if attempt > 1 {
            tracing::info!(
                operation = %self.operation,
                attempt = attempt,
                total_duration_ms = total_duration.as_millis() as u64,
                "succeeded after retry"
            );
        } else {
            tracing::debug!(
                operation = %self.operation,
                duration_ms = total_duration.as_millis() as u64,
                "succeeded on first attempt"
            );
        }
    }

    fn on_exhausted(&self, attempts: u32, main_error: &dyn Error) {
        tracing::error!(
            operation = %self.operation,
            attempts = attempts,
            error = %main_error,
            "all retry attempts exhausted"
        );
    }

    fn on_aborted(&self, attempt: u32, error: Option<&dyn Error>) {
        if let Some(err) = error {
            tracing::warn!(
                operation = %self.operation,
                attempt = attempt,
                error = %err,
                "retry aborted"
            );
        } else {
            tracing::warn!(
                operation = %self.operation,
                attempt = attempt,
                "retry aborted"
            );
        }
    }
}

/// An observer that counts retry events
///
/// Useful for testing and metrics collection.
#[derive(Debug, Default)]
pub struct StatsObserver {
    attempt_starts: AtomicU32,
    failures: AtomicU32,
    scheduled: AtomicU32,
    successes: AtomicU32,
    exhaustions: AtomicU32,
    aborts: AtomicU32,
}

impl StatsObserver {
    /// Create a new stats observer
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of attempt starts
    pub fn attempt_starts(&self) -> u32 {
        self.attempt_starts.load(Ordering::SeqCst)
    }

    /// Get the number of retryable failures
    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    /// Get the number of scheduled retries
    pub fn scheduled(&self) -> u32 {
        self.scheduled.load(Ordering::SeqCst)
    }

    /// Get the number of successes
    pub fn successes(&self) -> u32 {
        self.successes.load(Ordering::SeqCst)
    }

    /// Get the number of exhaustions
    pub fn exhaustions(&self) -> u32 {
        self.exhaustions.load(Ordering::SeqCst)
    }

    /// Get the number of early stops
    pub fn aborts(&self) -> u32 {
        self.aborts.load(Ordering::SeqCst)
    }
}

impl RetryObserver for StatsObserver {
    fn on_attempt_start(&self, _attempt: u32, _retries: u32) {
        self.attempt_starts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_attempt_failed(&self, _attempt: u32, _retries_left: u32, _error: &dyn Error) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }

    fn on_retry_scheduled(&self, _next_attempt: u32, _delay: Duration) {
        self.scheduled.fetch_add(1, Ordering::SeqCst);
    }

    fn on_success(&self, _attempt: u32, _total_duration: Duration) {
        self.successes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_exhausted(&self, _attempts: u32, _main_error: &dyn Error) {
        self.exhaustions.fetch_add(1, Ordering::SeqCst);
    }

    fn on_aborted(&self, _attempt: u32, _error: Option<&dyn Error>) {
        self.aborts.fetch_add(1, Ordering::SeqCst);
    }
}

/// Implement RetryObserver for Arc<T> where T: RetryObserver
impl<T: RetryObserver + ?Sized> RetryObserver for std::sync::Arc<T> {
    fn on_attempt_start(&self, attempt: u32, retries: u32) {
        (**self).on_attempt_start(attempt, retries)
    }

    fn on_attempt_failed(&self, attempt: u32, retries_left: u32, error: &dyn Error) {
        (**self).on_attempt_failed(attempt, retries_left, error)
    }

    fn on_retry_scheduled(&self, next_attempt: u32, delay: Duration) {
        (**self).on_retry_scheduled(next_attempt, delay)
    }

    fn on_success(&self, attempt: u32, total_duration: Duration) {
        (**self).on_success(attempt, total_duration)
    }

    fn on_exhausted(&self, attempts: u32, main_error: &dyn Error) {
        (**self).on_exhausted(attempts, main_error)
    }

    fn on_aborted(&self, attempt: u32, error: Option<&dyn Error>) {
        (**self).on_aborted(attempt, error)
    }
}
