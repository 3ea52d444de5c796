//! Retry controller
//!
//! Drives an action through a [`BackoffOperation`], classifying every
//! failure and deciding whether the session continues.

use std::error::Error;
use std::future::Future;

use retried_backoff::{BackoffOperation, ExponentialBackoff};
use tokio::time::Instant;

use crate::attempt::{classify, decorate, AttemptError, Classified};
use crate::error::RetryError;
use crate::options::RetryOptions;

/// Retry an async action with the given options
///
/// The action receives the 1-based attempt number. This is a convenience
/// wrapper around [`RetryController::run`].
///
/// # Example
///
/// ```rust
/// use retried_core::{retry, AttemptError, RetryOptions};
/// use std::io;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let options = RetryOptions::<io::Error>::builder().retries(0).build();
///
/// let result = retry(
///     |attempt| async move {
///         if attempt == 1 {
///             Ok("unicorn")
///         } else {
///             Err(AttemptError::transient(io::Error::other("flaky")))
///         }
///     },
///     options,
/// )
/// .await;
///
/// assert_eq!(result.unwrap(), "unicorn");
/// # }
/// ```
pub async fn retry<F, Fut, T, E>(action: F, options: RetryOptions<E>) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AttemptError<E>>>,
    E: Error + Send + Sync + 'static,
{
    RetryController::new(options).run(action).await
}

/// Runs retry sessions with a fixed set of options
///
/// A controller holds no per-session state: each call to [`run`] builds a
/// fresh backoff operation, so one controller can drive many sessions,
/// including concurrent ones.
///
/// [`run`]: RetryController::run
pub struct RetryController<E> {
    options: RetryOptions<E>,
}

impl<E> Clone for RetryController<E> {
    fn clone(&self) -> Self {
        Self {
            options: self.options.clone(),
        }
    }
}

impl<E> std::fmt::Debug for RetryController<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryController")
            .field("options", &self.options)
            .finish()
    }
}

impl<E> RetryController<E>
where
    E: Error + Send + Sync + 'static,
{
    /// Create a controller
    pub fn new(options: RetryOptions<E>) -> Self {
        Self { options }
    }

    /// The controller's options
    pub fn options(&self) -> &RetryOptions<E> {
        &self.options
    }

    /// Run one retry session with an [`ExponentialBackoff`] built from the
    /// options' policy
    ///
    /// # Returns
    ///
    /// The action's first successful value, or the [`RetryError`] that ended
    /// the session. An invalid policy fails before the action is called.
    pub async fn run<F, Fut, T>(&self, action: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AttemptError<E>>>,
    {
        let operation = ExponentialBackoff::new(self.options.policy.clone())?;
        self.run_with_operation(operation, action).await
    }

    /// Run one retry session against a caller-supplied backoff operation
    ///
    /// The operation decides how many attempts happen and how long to wait
    /// between them. The controller only reads the retry budget from the
    /// options to compute `retries_left`.
    pub async fn run_with_operation<O, F, Fut, T>(
        &self,
        mut operation: O,
        mut action: F,
    ) -> Result<T, RetryError<E>>
    where
        O: BackoffOperation<E>,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AttemptError<E>>>,
    {
        let start = Instant::now();
        let retries = self.options.retries();
        let observer = &self.options.observer;

        loop {
            let attempt = operation.attempt();
            observer.on_attempt_start(attempt, retries);

            let result = action(attempt).await;

            let error = match classify(result, &*self.options.network_error) {
                Classified::Success(value) => {
                    observer.on_success(attempt, start.elapsed());
                    return Ok(value);
                }
                Classified::NonError(value) => {
                    operation.stop();
                    observer.on_aborted(attempt, None);
                    return Err(RetryError::NonError { attempt, value });
                }
                Classified::Abort(reason) => {
                    operation.stop();
                    observer.on_aborted(attempt, Some(&reason));
                    return Err(RetryError::Aborted { attempt, reason });
                }
                Classified::Programmer(source) => {
                    operation.stop();
                    observer.on_aborted(attempt, Some(&source));
                    return Err(RetryError::Programmer { attempt, source });
                }
                Classified::Transient(error) => error,
            };

            let failed = decorate(error, attempt, retries);
            observer.on_attempt_failed(attempt, failed.retries_left(), failed.error());

            if let Some(hook) = &self.options.on_failed_attempt {
                if let Err(source) = hook.on_failed_attempt(&failed).await {
                    operation.stop();
                    let hook_error: &(dyn Error + 'static) = source.as_ref();
                    observer.on_aborted(attempt, Some(hook_error));
                    return Err(RetryError::Hook { attempt, source });
                }
            }

            if !operation.retry(failed.into_error()) {
                let total_duration = start.elapsed();
                return Err(match operation.main_error() {
                    Some(source) => {
                        observer.on_exhausted(attempt, &source);
                        if operation.timed_out() {
                            RetryError::TimedOut {
                                attempts: attempt,
                                source,
                                total_duration,
                            }
                        } else {
                            RetryError::Exhausted {
                                attempts: attempt,
                                source,
                                total_duration,
                            }
                        }
                    }
                    None => {
                        observer.on_aborted(attempt, None);
                        RetryError::Cancelled { attempts: attempt }
                    }
                });
            }

            let delay = operation.next_delay();
            observer.on_retry_scheduled(attempt.saturating_add(1), delay);

            if !delay.is_zero() {
                tracing::debug!(
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    "waiting before next attempt"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

impl<E> Default for RetryController<E>
where
    E: Error + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(RetryOptions::default())
    }
}

impl<E> From<RetryOptions<E>> for RetryController<E>
where
    E: Error + Send + Sync + 'static,
{
    fn from(options: RetryOptions<E>) -> Self {
        Self::new(options)
    }
}
