//! # retried-core
//!
//! Retry controller for async operations.
//!
//! An action is retried until it succeeds or its backoff operation refuses
//! another attempt. Every failure is classified first:
//!
//! - Transient errors are decorated with attempt counters, handed to the
//!   `on_failed_attempt` hook and retried
//! - Programmer errors stop the session, unless the network-error predicate
//!   recognises them (`"Failed to fetch"` by default)
//! - [`AbortError`]s stop the session and surface the original error
//! - Values that are not errors stop the session with a descriptive error
//!
//! # Features
//!
//! - Pluggable backoff via [`BackoffOperation`] (default [`ExponentialBackoff`])
//! - Async failed-attempt hook whose failure ends the session
//! - Observable sessions via the `RetryObserver` trait
//! - Built-in `TracingObserver` for logging
//! - Thread-safe with Send + Sync bounds
//!
//! # Example
//!
//! ```rust,no_run
//! use retried_core::{retry, AttemptError, RetryError, RetryOptions};
//! use std::io;
//!
//! async fn fetch_unicorn() -> Result<String, RetryError<io::Error>> {
//!     let options = RetryOptions::<io::Error>::builder()
//!         .retries(5)
//!         .on_failed_attempt_fn(|failed| {
//!             println!(
//!                 "Attempt {} failed. There are {} retries left.",
//!                 failed.attempt_number(),
//!                 failed.retries_left()
//!             );
//!             Ok(())
//!         })
//!         .build();
//!
//!     retry(
//!         |_attempt| async {
//!             // Your fallible operation here
//!             Ok::<_, AttemptError<io::Error>>("unicorn".to_string())
//!         },
//!         options,
//!     )
//!     .await
//! }
//! ```

mod abort;
mod attempt;
mod controller;
mod error;
mod observer;
mod options;
mod predicate;

pub use abort::{AbortError, AbortMessage, AbortReason};
pub use attempt::{decorate, AttemptError, FailedAttempt};
pub use controller::{retry, RetryController};
pub use error::RetryError;
pub use observer::{NoOpObserver, RetryObserver, StatsObserver, TracingObserver};
pub use options::{HookFn, OnFailedAttempt, RetryOptions, RetryOptionsBuilder};
pub use predicate::{
    ClosurePredicate, FailedToFetch, MessagePredicate, NetworkErrorPredicate, NoNetworkErrors,
    FAILED_TO_FETCH,
};

pub use retried_backoff::{BackoffOperation, BackoffPolicy, BackoffStrategy, ExponentialBackoff};

#[cfg(test)]
mod tests;
