//! Integration tests for the retry controller
//!
//! These tests drive complete retry sessions through the public entry
//! points, with the default backoff operation and with custom ones.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use retried_backoff::{BackoffOperation, BackoffPolicy, BackoffStrategy};

use crate::attempt::{AttemptError, FailedAttempt};
use crate::controller::{retry, RetryController};
use crate::error::RetryError;
use crate::observer::{StatsObserver, TracingObserver};
use crate::options::{OnFailedAttempt, RetryOptions};
use crate::predicate::{MessagePredicate, NoNetworkErrors};

/// Fixed 1ms delays so sessions finish quickly even without paused time
fn quick_policy(retries: u32) -> BackoffPolicy {
    BackoffPolicy {
        retries,
        strategy: BackoffStrategy::Fixed,
        min_timeout_ms: 1,
        ..BackoffPolicy::default()
    }
}

fn flaky(message: &str) -> AttemptError<io::Error> {
    AttemptError::transient(io::Error::other(message.to_string()))
}

type AttemptFuture = Pin<Box<dyn Future<Output = Result<(), AttemptError<io::Error>>> + Send>>;

/// Action that fails transiently every time and counts its calls
fn always_failing(calls: &Arc<AtomicU32>) -> impl FnMut(u32) -> AttemptFuture {
    let calls = calls.clone();
    move |_| {
        let calls = calls.clone();
        Box::pin(async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(flaky("flaky"))
        })
    }
}

// ============================================================================
// Retry Budget Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_runs_at_most_retries_plus_one() {
    for retries in [0, 1, 3, 10] {
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), RetryError<io::Error>> = retry(
            always_failing(&calls),
            RetryOptions::with_policy(quick_policy(retries)),
        )
        .await;

        let err = result.unwrap_err();
        assert!(err.is_exhausted(), "retries = {}", retries);
        assert_eq!(err.attempts(), retries + 1);
        assert_eq!(calls.load(Ordering::SeqCst), retries + 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_default_policy_uses_exponential_delays() {
    let calls = Arc::new(AtomicU32::new(0));
    let observer = Arc::new(StatsObserver::new());
    let start = tokio::time::Instant::now();

    let result = retry(
        always_failing(&calls),
        RetryOptions::builder()
            .retries(3)
            .observer(observer.clone())
            .build(),
    )
    .await;

    assert!(result.unwrap_err().is_exhausted());
    assert_eq!(observer.scheduled(), 3);
    // 1s + 2s + 4s
    assert!(start.elapsed() >= Duration::from_secs(7));
}

#[tokio::test(start_paused = true)]
async fn test_retries_left_counts_down() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let calls = Arc::new(AtomicU32::new(0));

    let options = RetryOptions::builder()
        .policy(quick_policy(3))
        .on_failed_attempt_fn(move |failed: &FailedAttempt<io::Error>| {
            seen_clone
                .lock()
                .unwrap()
                .push((failed.attempt_number(), failed.retries_left()));
            Ok(())
        })
        .build();

    let result = retry(always_failing(&calls), options).await;

    assert!(result.is_err());
    assert_eq!(
        *seen.lock().unwrap(),
        vec![(1, 3), (2, 2), (3, 1), (4, 0)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_action_receives_attempt_numbers() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();

    let result: Result<u32, RetryError<io::Error>> = retry(
        move |attempt| {
            seen_clone.lock().unwrap().push(attempt);
            async move {
                if attempt < 4 {
                    Err(flaky("not yet"))
                } else {
                    Ok(attempt)
                }
            }
        },
        RetryOptions::with_policy(quick_policy(5)),
    )
    .await;

    assert_eq!(result.unwrap(), 4);
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 4]);
}

// ============================================================================
// Classification Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_non_error_rejects_immediately() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_clone = calls.clone();

    let result: Result<(), RetryError<io::Error>> = retry(
        move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            async { Err(AttemptError::non_error("boom")) }
        },
        RetryOptions::with_policy(quick_policy(5)),
    )
    .await;

    let err = result.unwrap_err();
    assert!(err.is_non_error());
    assert!(err.to_string().contains("boom"));
    assert!(err.to_string().contains("You should only throw errors."));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_abort_with_message_stops() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_clone = calls.clone();
    let hook_calls = Arc::new(AtomicU32::new(0));
    let hook_calls_clone = hook_calls.clone();

    let options = RetryOptions::builder()
        .policy(quick_policy(5))
        .on_failed_attempt_fn(move |_: &FailedAttempt<io::Error>| {
            hook_calls_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .build();

    let result: Result<(), _> = retry(
        move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            async { Err(AttemptError::abort("stop now")) }
        },
        options,
    )
    .await;

    let err = result.unwrap_err();
    assert!(err.is_aborted());
    assert_eq!(err.to_string(), "stop now");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(hook_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_abort_with_error_surfaces_original() {
    let result: Result<(), RetryError<io::Error>> = retry(
        |attempt| async move {
            if attempt == 1 {
                Err(flaky("first"))
            } else {
                Err(AttemptError::abort_with(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "forbidden",
                )))
            }
        },
        RetryOptions::with_policy(quick_policy(5)),
    )
    .await;

    let err = result.unwrap_err();
    assert_eq!(err.attempts(), 2);
    assert_eq!(err.to_string(), "forbidden");
    assert_eq!(
        err.into_source().unwrap().kind(),
        io::ErrorKind::PermissionDenied
    );
}

#[tokio::test(start_paused = true)]
async fn test_programmer_error_runs_once() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_clone = calls.clone();

    let result: Result<(), RetryError<io::Error>> = retry(
        move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            async {
                Err(AttemptError::programmer(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "bad input",
                )))
            }
        },
        RetryOptions::with_policy(quick_policy(5)),
    )
    .await;

    let err = result.unwrap_err();
    assert!(err.is_programmer());
    assert_eq!(err.to_string(), "bad input");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_to_fetch_is_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_clone = calls.clone();

    let result: Result<(), RetryError<io::Error>> = retry(
        move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            async { Err(AttemptError::programmer(io::Error::other("Failed to fetch"))) }
        },
        RetryOptions::with_policy(quick_policy(2)),
    )
    .await;

    let err = result.unwrap_err();
    assert!(err.is_exhausted());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(err.into_source().unwrap().to_string(), "Failed to fetch");
}

#[tokio::test(start_paused = true)]
async fn test_custom_network_predicate() {
    // Widened: Safari's wording is retried
    let calls = Arc::new(AtomicU32::new(0));
    let calls_clone = calls.clone();
    let options = RetryOptions::builder()
        .policy(quick_policy(1))
        .network_error(MessagePredicate::fetch_errors())
        .build();

    let result: Result<(), RetryError<io::Error>> = retry(
        move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            async { Err(AttemptError::programmer(io::Error::other("Load failed"))) }
        },
        options,
    )
    .await;

    assert!(result.unwrap_err().is_exhausted());
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // Narrowed: even "Failed to fetch" is a bug
    let calls = Arc::new(AtomicU32::new(0));
    let calls_clone = calls.clone();
    let options = RetryOptions::builder()
        .policy(quick_policy(3))
        .network_error(NoNetworkErrors)
        .build();

    let result: Result<(), RetryError<io::Error>> = retry(
        move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            async { Err(AttemptError::programmer(io::Error::other("Failed to fetch"))) }
        },
        options,
    )
    .await;

    assert!(result.unwrap_err().is_programmer());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Hook Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_success_on_third_attempt() {
    let hook_calls = Arc::new(AtomicU32::new(0));
    let hook_calls_clone = hook_calls.clone();
    let observer = Arc::new(StatsObserver::new());

    let options = RetryOptions::builder()
        .policy(quick_policy(5))
        .observer(observer.clone())
        .on_failed_attempt_fn(move |_: &FailedAttempt<io::Error>| {
            hook_calls_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .build();

    let result = retry(
        |attempt| async move {
            match attempt {
                1 | 2 => Err(flaky("not ready")),
                _ => Ok(format!("ready on attempt {}", attempt)),
            }
        },
        options,
    )
    .await;

    assert_eq!(result.unwrap(), "ready on attempt 3");
    assert_eq!(hook_calls.load(Ordering::SeqCst), 2);
    assert_eq!(observer.attempt_starts(), 3);
    assert_eq!(observer.failures(), 2);
    assert_eq!(observer.scheduled(), 2);
    assert_eq!(observer.successes(), 1);
    assert_eq!(observer.exhaustions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failing_hook_stops_retrying() {
    let calls = Arc::new(AtomicU32::new(0));
    let observer = Arc::new(StatsObserver::new());

    let options = RetryOptions::builder()
        .policy(quick_policy(5))
        .observer(observer.clone())
        .on_failed_attempt_fn(|_: &FailedAttempt<io::Error>| {
            anyhow::bail!("hook exploded")
        })
        .build();

    let result = retry(always_failing(&calls), options).await;

    let err = result.unwrap_err();
    assert!(err.is_hook_failure());
    assert_eq!(err.to_string(), "hook exploded");
    assert_eq!(err.attempts(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(observer.scheduled(), 0);
    assert_eq!(observer.aborts(), 1);
}

/// Async hook that records events in order
struct RecordingHook {
    events: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl OnFailedAttempt<io::Error> for RecordingHook {
    async fn on_failed_attempt(&self, failed: &FailedAttempt<io::Error>) -> anyhow::Result<()> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.events
            .lock()
            .unwrap()
            .push(format!("hook {}", failed.attempt_number()));
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_async_hook_completes_before_next_attempt() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let action_events = events.clone();

    let options = RetryOptions::builder()
        .policy(quick_policy(2))
        .on_failed_attempt(RecordingHook {
            events: events.clone(),
        })
        .build();

    let result = retry(
        move |attempt| {
            action_events
                .lock()
                .unwrap()
                .push(format!("attempt {}", attempt));
            async move {
                if attempt < 3 {
                    Err(flaky("later"))
                } else {
                    Ok(())
                }
            }
        },
        options,
    )
    .await;

    assert!(result.is_ok());
    assert_eq!(
        *events.lock().unwrap(),
        vec!["attempt 1", "hook 1", "attempt 2", "hook 2", "attempt 3"]
    );
}

// ============================================================================
// Session Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_sessions_are_independent() {
    let controller: RetryController<io::Error> =
        RetryController::new(RetryOptions::with_policy(quick_policy(1)));

    let calls = Arc::new(AtomicU32::new(0));
    let first = controller.run(always_failing(&calls)).await;
    assert_eq!(first.unwrap_err().attempts(), 2);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let second = controller
        .run(move |attempt| {
            seen_clone.lock().unwrap().push(attempt);
            async { Ok::<_, AttemptError<io::Error>>("fresh") }
        })
        .await;

    assert_eq!(second.unwrap(), "fresh");
    assert_eq!(*seen.lock().unwrap(), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_sessions_share_controller() {
    let controller: RetryController<io::Error> =
        RetryController::new(RetryOptions::with_policy(quick_policy(3)));

    let failing = controller.run(|attempt| async move {
        if attempt < 3 {
            Err(flaky("slow start"))
        } else {
            Ok(attempt)
        }
    });
    let immediate = controller.run(|attempt| async move { Ok(attempt) });

    let (failing, immediate) = tokio::join!(failing, immediate);

    assert_eq!(failing.unwrap(), 3);
    assert_eq!(immediate.unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_policy_is_rejected() {
    let calls = Arc::new(AtomicU32::new(0));
    let policy = BackoffPolicy {
        min_timeout_ms: 2000,
        max_timeout_ms: Some(1000),
        ..BackoffPolicy::default()
    };

    let result = retry(always_failing(&calls), RetryOptions::with_policy(policy)).await;

    let err = result.unwrap_err();
    assert!(matches!(err, RetryError::InvalidPolicy(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_main_error_is_most_frequent() {
    let result: Result<(), RetryError<io::Error>> = retry(
        |attempt| async move {
            let message = match attempt {
                1 | 3 => "connection reset",
                _ => "timeout",
            };
            Err(flaky(message))
        },
        RetryOptions::with_policy(quick_policy(3)),
    )
    .await;

    // "connection reset" and "timeout" tie at two each; the latest wins
    let err = result.unwrap_err();
    assert_eq!(err.into_source().unwrap().to_string(), "timeout");

    let result: Result<(), RetryError<io::Error>> = retry(
        |attempt| async move {
            let message = if attempt == 2 { "timeout" } else { "connection reset" };
            Err(flaky(message))
        },
        RetryOptions::with_policy(quick_policy(2)),
    )
    .await;

    let err = result.unwrap_err();
    assert_eq!(err.into_source().unwrap().to_string(), "connection reset");
}

// ============================================================================
// Backoff Operation Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_forever_keeps_retrying() {
    let policy = BackoffPolicy {
        forever: true,
        ..quick_policy(1)
    };

    let result: Result<u32, RetryError<io::Error>> = retry(
        |attempt| async move {
            if attempt < 8 {
                Err(flaky("down"))
            } else {
                Ok(attempt)
            }
        },
        RetryOptions::with_policy(policy),
    )
    .await;

    assert_eq!(result.unwrap(), 8);
}

#[tokio::test(start_paused = true)]
async fn test_max_retry_time_stops_session() {
    let policy = BackoffPolicy {
        min_timeout_ms: 20,
        max_retry_time_ms: Some(50),
        ..quick_policy(10)
    };

    let result: Result<(), RetryError<io::Error>> = retry(
        |_| async { Err(flaky("slow")) },
        RetryOptions::builder()
            .policy(policy)
            .observer(TracingObserver::new("time-limited"))
            .build(),
    )
    .await;

    let err = result.unwrap_err();
    assert!(err.is_timeout());
    assert!(err.is_exhausted());
    // Attempts at 0ms, 20ms, 40ms and 60ms; the last one is past the limit
    assert_eq!(err.attempts(), 4);
    assert!(matches!(
        err,
        RetryError::TimedOut { total_duration, .. } if total_duration >= Duration::from_millis(50)
    ));
}

/// Operation granting a fixed number of retries with no delay
struct CountingOperation {
    attempts: u32,
    limit: u32,
    errors: Vec<io::Error>,
    record_errors: bool,
    stopped: Arc<AtomicBool>,
}

impl CountingOperation {
    fn new(limit: u32) -> Self {
        Self {
            attempts: 0,
            limit,
            errors: Vec::new(),
            record_errors: true,
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl BackoffOperation<io::Error> for CountingOperation {
    fn attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    fn retry(&mut self, error: io::Error) -> bool {
        if self.record_errors {
            self.errors.push(error);
        }
        !self.stopped.load(Ordering::SeqCst) && self.attempts <= self.limit
    }

    fn next_delay(&self) -> Duration {
        Duration::ZERO
    }

    fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn main_error(&mut self) -> Option<io::Error> {
        self.errors.pop()
    }
}

#[tokio::test]
async fn test_custom_operation_controls_budget() {
    let controller: RetryController<io::Error> = RetryController::default();
    let calls = Arc::new(AtomicU32::new(0));

    let result = controller
        .run_with_operation(CountingOperation::new(2), always_failing(&calls))
        .await;

    let err = result.unwrap_err();
    assert!(err.is_exhausted());
    assert_eq!(err.attempts(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_custom_operation_without_errors_is_cancelled() {
    let controller: RetryController<io::Error> = RetryController::default();
    let calls = Arc::new(AtomicU32::new(0));
    let operation = CountingOperation {
        record_errors: false,
        ..CountingOperation::new(0)
    };

    let result = controller
        .run_with_operation(operation, always_failing(&calls))
        .await;

    let err = result.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(err.attempts(), 1);
}

#[tokio::test]
async fn test_fatal_errors_stop_operation() {
    let controller: RetryController<io::Error> = RetryController::default();
    let operation = CountingOperation::new(5);
    let stopped = operation.stopped.clone();

    let result: Result<(), _> = controller
        .run_with_operation(operation, |_| async {
            Err(AttemptError::programmer(io::Error::other("bad input")))
        })
        .await;

    assert!(result.unwrap_err().is_programmer());
    assert!(stopped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_boxed_operation() {
    let controller: RetryController<io::Error> = RetryController::default();
    let operation: Box<dyn BackoffOperation<io::Error>> = Box::new(CountingOperation::new(1));

    let result = controller
        .run_with_operation(operation, |attempt| async move {
            if attempt == 1 {
                Err(flaky("once"))
            } else {
                Ok("boxed")
            }
        })
        .await;

    assert_eq!(result.unwrap(), "boxed");
}
