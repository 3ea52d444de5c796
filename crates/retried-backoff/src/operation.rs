//! Backoff operations
//!
//! A [`BackoffOperation`] owns the retry budget of one retry session. The
//! caller begins each attempt through it, reports every failure to it and
//! asks it how long to wait. It never looks at *why* an attempt failed.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::Result;
use crate::policy::BackoffPolicy;
use crate::strategies::delay_table;

/// Budget and scheduling for one retry session
///
/// # Example
///
/// ```rust
/// use retried_backoff::{BackoffOperation, BackoffPolicy, ExponentialBackoff};
/// use std::io;
///
/// let mut operation: ExponentialBackoff<io::Error> =
///     ExponentialBackoff::new(BackoffPolicy::with_retries(1)).unwrap();
///
/// assert_eq!(operation.attempt(), 1);
/// assert!(operation.retry(io::Error::other("flaky")));
/// assert_eq!(operation.attempt(), 2);
/// assert!(!operation.retry(io::Error::other("flaky")));
/// assert_eq!(operation.main_error().unwrap().to_string(), "flaky");
/// ```
pub trait BackoffOperation<E>: Send {
    /// Begin the next attempt and return its number (starting at 1)
    fn attempt(&mut self) -> u32;

    /// Record a failed attempt
    ///
    /// Returns `true` if another attempt has been scheduled, `false` once the
    /// budget is spent or the operation was stopped.
    fn retry(&mut self, error: E) -> bool;

    /// Delay before the attempt scheduled by the last successful `retry`
    fn next_delay(&self) -> Duration;

    /// Cancel any scheduled attempt; later calls to `retry` return `false`
    fn stop(&mut self);

    /// Take the error that best represents the recorded failures
    fn main_error(&mut self) -> Option<E>;

    /// Whether the last refusal was caused by the retry-time budget
    fn timed_out(&self) -> bool {
        false
    }
}

impl<E, O: BackoffOperation<E> + ?Sized> BackoffOperation<E> for Box<O> {
    fn attempt(&mut self) -> u32 {
        (**self).attempt()
    }

    fn retry(&mut self, error: E) -> bool {
        (**self).retry(error)
    }

    fn next_delay(&self) -> Duration {
        (**self).next_delay()
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn main_error(&mut self) -> Option<E> {
        (**self).main_error()
    }

    fn timed_out(&self) -> bool {
        (**self).timed_out()
    }
}

/// The default operation: a precomputed delay table with optional
/// `forever` and retry-time limits
///
/// Recorded errors are ranked by their `Display` output; the most frequent
/// message wins and ties go to the most recent error.
#[derive(Debug)]
pub struct ExponentialBackoff<E> {
    policy: BackoffPolicy,
    delays: VecDeque<Duration>,
    /// Delay repeated once the table runs out (`forever` only)
    repeat_delay: Option<Duration>,
    errors: Vec<E>,
    attempts: u32,
    next_delay: Duration,
    started: Option<Instant>,
    timed_out: bool,
}

impl<E> ExponentialBackoff<E> {
    /// Create an operation from a policy
    ///
    /// # Errors
    ///
    /// Returns a [`BackoffError`](crate::BackoffError) if the policy fails
    /// validation.
    pub fn new(policy: BackoffPolicy) -> Result<Self> {
        policy.validate()?;

        let delays = delay_table(&policy);
        let repeat_delay = if policy.forever {
            delays.last().copied()
        } else {
            None
        };

        Ok(Self {
            policy,
            delays: delays.into(),
            repeat_delay,
            errors: Vec::new(),
            attempts: 1,
            next_delay: Duration::ZERO,
            started: None,
            timed_out: false,
        })
    }

    /// The policy this operation was built from
    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Delays not yet consumed, in the order they will be used
    pub fn remaining_delays(&self) -> impl Iterator<Item = Duration> + '_ {
        self.delays.iter().copied()
    }

    /// All errors currently recorded, oldest first
    pub fn errors(&self) -> &[E] {
        &self.errors
    }

    /// Number of the current attempt
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    fn retry_time_elapsed(&self) -> bool {
        match (self.policy.max_retry_time(), self.started) {
            (Some(limit), Some(started)) => started.elapsed() >= limit,
            _ => false,
        }
    }
}

impl<E> BackoffOperation<E> for ExponentialBackoff<E>
where
    E: fmt::Display + Send,
{
    fn attempt(&mut self) -> u32 {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
        self.attempts
    }

    fn retry(&mut self, error: E) -> bool {
        if self.retry_time_elapsed() {
            tracing::debug!(
                attempts = self.attempts,
                max_retry_time_ms = self.policy.max_retry_time_ms,
                "retry time budget elapsed"
            );
            self.errors.push(error);
            self.timed_out = true;
            return false;
        }

        self.errors.push(error);

        let delay = match self.delays.pop_front() {
            Some(delay) => delay,
            None => match self.repeat_delay {
                Some(delay) => {
                    // Running forever: only the latest error is worth keeping
                    let keep_from = self.errors.len() - 1;
                    self.errors.drain(..keep_from);
                    delay
                }
                None => return false,
            },
        };

        self.next_delay = delay;
        self.attempts += 1;
        true
    }

    fn next_delay(&self) -> Duration {
        self.next_delay
    }

    fn stop(&mut self) {
        self.delays.clear();
        self.repeat_delay = None;
        self.next_delay = Duration::ZERO;
    }

    fn main_error(&mut self) -> Option<E> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        let mut main: Option<(usize, usize)> = None;

        for (index, error) in self.errors.iter().enumerate() {
            let message = error.to_string();
            let count = match counts.iter_mut().find(|(seen, _)| *seen == message) {
                Some((_, count)) => {
                    *count += 1;
                    *count
                }
                None => {
                    counts.push((message, 1));
                    1
                }
            };

            if main.map_or(true, |(_, best)| count >= best) {
                main = Some((index, count));
            }
        }

        main.map(|(index, _)| self.errors.swap_remove(index))
    }

    fn timed_out(&self) -> bool {
        self.timed_out
    }
}
