//! Network-error predicates
//!
//! Some HTTP stacks report a lost connection as a programmer error (a
//! `TypeError` in browser `fetch`). A [`NetworkErrorPredicate`] lets the
//! controller retry those instead of treating them as bugs.
//!
//! The wording is platform specific: browsers disagree on the message, so
//! the default [`FailedToFetch`] only covers the most common one. Supply
//! your own predicate when targeting a different stack.

use std::fmt;

/// Decides whether a programmer error is really a network failure
///
/// # Example
///
/// ```rust
/// use retried_core::NetworkErrorPredicate;
/// use std::io::{Error, ErrorKind};
///
/// struct ResetIsNetwork;
///
/// impl NetworkErrorPredicate<Error> for ResetIsNetwork {
///     fn is_network_error(&self, error: &Error) -> bool {
///         error.kind() == ErrorKind::ConnectionReset
///     }
/// }
/// ```
pub trait NetworkErrorPredicate<E: ?Sized>: Send + Sync {
    /// Whether the error should be retried as a network failure
    fn is_network_error(&self, error: &E) -> bool;
}

/// Message reported by browser `fetch` on a network failure
pub const FAILED_TO_FETCH: &str = "Failed to fetch";

/// Matches errors whose message is exactly `"Failed to fetch"` (the default)
#[derive(Debug, Clone, Copy, Default)]
pub struct FailedToFetch;

impl<E: fmt::Display + ?Sized> NetworkErrorPredicate<E> for FailedToFetch {
    fn is_network_error(&self, error: &E) -> bool {
        error.to_string() == FAILED_TO_FETCH
    }
}

/// Never treats a programmer error as a network failure
#[derive(Debug, Clone, Copy)]
pub struct NoNetworkErrors;

impl<E: ?Sized> NetworkErrorPredicate<E> for NoNetworkErrors {
    fn is_network_error(&self, _error: &E) -> bool {
        false
    }
}

/// A predicate that uses a closure
pub struct ClosurePredicate<F> {
    predicate: F,
}

impl<F> ClosurePredicate<F> {
    /// Create a new closure-based predicate
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<E, F> NetworkErrorPredicate<E> for ClosurePredicate<F>
where
    F: Fn(&E) -> bool + Send + Sync,
{
    fn is_network_error(&self, error: &E) -> bool {
        (self.predicate)(error)
    }
}

/// Matches errors whose message contains any of the given patterns
/// (case-insensitive)
#[derive(Debug, Clone)]
pub struct MessagePredicate {
    patterns: Vec<String>,
}

impl MessagePredicate {
    /// Create a predicate from message fragments
    pub fn new(patterns: Vec<String>) -> Self {
        Self {
            patterns: patterns.into_iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// Messages browsers use for failed `fetch` calls
    pub fn fetch_errors() -> Self {
        Self::new(vec![
            FAILED_TO_FETCH.to_string(),
            "NetworkError when attempting to fetch resource".to_string(),
            "Network request failed".to_string(),
            "Load failed".to_string(),
        ])
    }
}

impl<E: fmt::Display + ?Sized> NetworkErrorPredicate<E> for MessagePredicate {
    fn is_network_error(&self, error: &E) -> bool {
        let message = error.to_string().to_lowercase();
        self.patterns
            .iter()
            .any(|pattern| message.contains(pattern.as_str()))
    }
}

impl<E: ?Sized, P: NetworkErrorPredicate<E> + ?Sized> NetworkErrorPredicate<E>
    for std::sync::Arc<P>
{
    fn is_network_error(&self, error: &E) -> bool {
        (**self).is_network_error(error)
    }
}
