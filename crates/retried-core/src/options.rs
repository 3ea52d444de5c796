//! Retry options and the failed-attempt hook

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use retried_backoff::BackoffPolicy;

use crate::attempt::FailedAttempt;
use crate::observer::{NoOpObserver, RetryObserver};
use crate::predicate::{ClosurePredicate, FailedToFetch, NetworkErrorPredicate};

/// Hook invoked after every retryable failure
///
/// The hook runs before the next attempt is scheduled and is awaited to
/// completion. If it returns an error, the retry session ends with
/// [`RetryError::Hook`](crate::RetryError::Hook) no matter how many retries
/// are left.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use retried_core::{FailedAttempt, OnFailedAttempt};
/// use std::io;
///
/// struct AuditLog;
///
/// #[async_trait]
/// impl OnFailedAttempt<io::Error> for AuditLog {
///     async fn on_failed_attempt(&self, failed: &FailedAttempt<io::Error>) -> anyhow::Result<()> {
///         println!(
///             "Attempt {} failed. There are {} retries left.",
///             failed.attempt_number(),
///             failed.retries_left()
///         );
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait OnFailedAttempt<E>: Send + Sync {
    /// Inspect a failed attempt
    async fn on_failed_attempt(&self, failed: &FailedAttempt<E>) -> anyhow::Result<()>;
}

/// Adapts a synchronous closure into an [`OnFailedAttempt`] hook
pub struct HookFn<F> {
    hook: F,
}

impl<F> HookFn<F> {
    /// Wrap a closure
    pub fn new(hook: F) -> Self {
        Self { hook }
    }
}

#[async_trait]
impl<E, F> OnFailedAttempt<E> for HookFn<F>
where
    E: Send + Sync + 'static,
    F: Fn(&FailedAttempt<E>) -> anyhow::Result<()> + Send + Sync,
{
    async fn on_failed_attempt(&self, failed: &FailedAttempt<E>) -> anyhow::Result<()> {
        (self.hook)(failed)
    }
}

/// Options for one retry controller
///
/// Cloning is cheap: the hook, predicate and observer are shared.
pub struct RetryOptions<E> {
    pub(crate) policy: BackoffPolicy,
    pub(crate) on_failed_attempt: Option<Arc<dyn OnFailedAttempt<E>>>,
    pub(crate) network_error: Arc<dyn NetworkErrorPredicate<E>>,
    pub(crate) observer: Arc<dyn RetryObserver>,
}

impl<E> RetryOptions<E>
where
    E: fmt::Display + Send + Sync + 'static,
{
    /// Options with the default policy (10 retries), no hook, the
    /// `"Failed to fetch"` network predicate and no observer
    pub fn new() -> Self {
        Self::with_policy(BackoffPolicy::default())
    }

    /// Default options around a custom backoff policy
    pub fn with_policy(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            on_failed_attempt: None,
            network_error: Arc::new(FailedToFetch),
            observer: Arc::new(NoOpObserver),
        }
    }

    /// Start building options
    pub fn builder() -> RetryOptionsBuilder<E> {
        RetryOptionsBuilder {
            options: Self::new(),
        }
    }
}

impl<E> Default for RetryOptions<E>
where
    E: fmt::Display + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> RetryOptions<E> {
    /// Maximum number of retries after the first attempt
    pub fn retries(&self) -> u32 {
        self.policy.retries
    }

    /// The backoff policy forwarded to the operation
    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Whether an `on_failed_attempt` hook is set
    pub fn has_hook(&self) -> bool {
        self.on_failed_attempt.is_some()
    }
}

impl<E> Clone for RetryOptions<E> {
    fn clone(&self) -> Self {
        Self {
            policy: self.policy.clone(),
            on_failed_attempt: self.on_failed_attempt.clone(),
            network_error: Arc::clone(&self.network_error),
            observer: Arc::clone(&self.observer),
        }
    }
}

impl<E> fmt::Debug for RetryOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("policy", &self.policy)
            .field("on_failed_attempt", &self.has_hook())
            .finish_non_exhaustive()
    }
}

/// Builder for [`RetryOptions`]
///
/// # Example
///
/// ```rust
/// use retried_core::{RetryOptions, TracingObserver};
/// use std::io;
///
/// let options = RetryOptions::<io::Error>::builder()
///     .retries(5)
///     .on_failed_attempt_fn(|failed| {
///         println!("attempt {} failed", failed.attempt_number());
///         Ok(())
///     })
///     .observer(TracingObserver::new("download"))
///     .build();
///
/// assert_eq!(options.retries(), 5);
/// ```
pub struct RetryOptionsBuilder<E> {
    options: RetryOptions<E>,
}

impl<E> RetryOptionsBuilder<E>
where
    E: Send + Sync + 'static,
{
    /// Set the retry budget
    pub fn retries(mut self, retries: u32) -> Self {
        self.options.policy.retries = retries;
        self
    }

    /// Replace the backoff policy (including its retry budget)
    pub fn policy(mut self, policy: BackoffPolicy) -> Self {
        self.options.policy = policy;
        self
    }

    /// Set the hook invoked after each retryable failure
    pub fn on_failed_attempt<H>(mut self, hook: H) -> Self
    where
        H: OnFailedAttempt<E> + 'static,
    {
        self.options.on_failed_attempt = Some(Arc::new(hook));
        self
    }

    /// Set a synchronous closure as the failed-attempt hook
    pub fn on_failed_attempt_fn<F>(self, hook: F) -> Self
    where
        F: Fn(&FailedAttempt<E>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_failed_attempt(HookFn::new(hook))
    }

    /// Set the predicate that turns programmer errors into retryable
    /// network failures
    pub fn network_error<P>(mut self, predicate: P) -> Self
    where
        P: NetworkErrorPredicate<E> + 'static,
    {
        self.options.network_error = Arc::new(predicate);
        self
    }

    /// Set the network-error predicate from a closure
    pub fn network_error_fn<F>(self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.network_error(ClosurePredicate::new(predicate))
    }

    /// Set the observer
    pub fn observer<O>(mut self, observer: O) -> Self
    where
        O: RetryObserver + 'static,
    {
        self.options.observer = Arc::new(observer);
        self
    }

    /// Build the options
    pub fn build(self) -> RetryOptions<E> {
        self.options
    }
}
