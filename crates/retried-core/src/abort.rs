//! Abort requests
//!
//! An action returns an [`AbortError`] to stop the retry session at once.
//! The controller unwraps it and surfaces the original error, skipping the
//! hook, the retry budget and any backoff delay.

use std::error::Error;
use std::fmt;
use std::panic::Location;

use thiserror::Error;

/// Error created by [`AbortError::new`] from a plain message
///
/// Records where the abort was requested in place of a stack trace.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct AbortMessage {
    message: String,
    location: &'static Location<'static>,
}

impl AbortMessage {
    /// The abort message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Source location of the `AbortError::new` call
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }
}

/// The error an abort carries back to the caller
#[derive(Debug)]
pub enum AbortReason<E> {
    /// An error supplied by the action
    Error(E),
    /// A message-only abort
    Message(AbortMessage),
}

impl<E> AbortReason<E> {
    /// The supplied error, if the abort was built from one
    pub fn into_error(self) -> Option<E> {
        match self {
            AbortReason::Error(err) => Some(err),
            AbortReason::Message(_) => None,
        }
    }

    /// Borrow the supplied error, if any
    pub fn error(&self) -> Option<&E> {
        match self {
            AbortReason::Error(err) => Some(err),
            AbortReason::Message(_) => None,
        }
    }

    /// Map the supplied error using a closure
    pub fn map_err<F, E2>(self, f: F) -> AbortReason<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            AbortReason::Error(err) => AbortReason::Error(f(err)),
            AbortReason::Message(message) => AbortReason::Message(message),
        }
    }
}

impl<E: fmt::Display> fmt::Display for AbortReason<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::Error(err) => write!(f, "{}", err),
            AbortReason::Message(message) => write!(f, "{}", message),
        }
    }
}

impl<E: Error + 'static> Error for AbortReason<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AbortReason::Error(err) => err.source(),
            AbortReason::Message(_) => None,
        }
    }
}

/// Request to stop retrying immediately
///
/// # Example
///
/// ```rust
/// use retried_core::AbortError;
/// use std::io;
///
/// let from_message: AbortError<io::Error> = AbortError::new("stop now");
/// assert_eq!(from_message.to_string(), "stop now");
///
/// let from_error = AbortError::from_error(io::Error::other("forbidden"));
/// assert_eq!(from_error.message(), "forbidden");
/// ```
#[derive(Debug)]
pub struct AbortError<E> {
    reason: AbortReason<E>,
    message: String,
}

impl<E> AbortError<E> {
    /// Name used to tell aborts apart from other failures in logs
    pub const NAME: &'static str = "AbortError";

    /// Abort with a message, recording the caller's location
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            reason: AbortReason::Message(AbortMessage {
                message: message.clone(),
                location: Location::caller(),
            }),
            message,
        }
    }

    /// Abort with an existing error, which becomes the original error
    pub fn from_error(error: E) -> Self
    where
        E: fmt::Display,
    {
        Self {
            message: error.to_string(),
            reason: AbortReason::Error(error),
        }
    }

    /// The message, mirrored from the original error
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The name of this error kind
    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Borrow the original error
    pub fn reason(&self) -> &AbortReason<E> {
        &self.reason
    }

    /// Unwrap the original error
    pub fn into_reason(self) -> AbortReason<E> {
        self.reason
    }
}

impl<E> fmt::Display for AbortError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl<E: Error + 'static> Error for AbortError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.reason {
            AbortReason::Error(err) => Some(err),
            AbortReason::Message(message) => Some(message),
        }
    }
}
