//! Delay calculation for each backoff strategy

use crate::policy::{BackoffPolicy, BackoffStrategy};
use rand::Rng;
use std::time::Duration;

/// Calculate the delay before a retry
///
/// # Arguments
///
/// * `policy` - The policy containing strategy and timing parameters
/// * `retry_index` - Which retry this delay precedes (0 for the first retry)
/// * `random` - Multiplier applied before capping, `1.0` for no randomization
///
/// # Example
///
/// ```rust
/// use retried_backoff::{calculate_delay, BackoffPolicy};
///
/// let policy = BackoffPolicy::default();
///
/// assert_eq!(calculate_delay(&policy, 0, 1.0).as_millis(), 1000);
/// assert_eq!(calculate_delay(&policy, 3, 1.0).as_millis(), 8000);
/// ```
pub fn calculate_delay(policy: &BackoffPolicy, retry_index: u32, random: f64) -> Duration {
    // A zero min-timeout would make every strategy collapse to zero
    let min_timeout = policy.min_timeout_ms.max(1) as f64;

    let base_delay_ms = match policy.strategy {
        BackoffStrategy::None => return Duration::ZERO,

        BackoffStrategy::Fixed => min_timeout,

        BackoffStrategy::Linear => min_timeout * (retry_index as f64 + 1.0),

        BackoffStrategy::Exponential => min_timeout * policy.factor.powf(retry_index as f64),
    };

    let delay_ms = (random * base_delay_ms).round();
    let capped_ms = match policy.max_timeout_ms {
        Some(max) => delay_ms.min(max as f64),
        None => delay_ms,
    };

    // `as` saturates, so an overflowing exponential lands on u64::MAX
    Duration::from_millis(capped_ms as u64)
}

/// Random multiplier for one delay
///
/// Returns a value in `[1, 2)` when `randomize` is set, otherwise `1.0`.
pub fn random_factor(randomize: bool) -> f64 {
    if randomize {
        1.0 + rand::rng().random::<f64>()
    } else {
        1.0
    }
}

/// Build the full, ascending list of delays a policy allows
///
/// One entry per retry. A policy with `forever` set and no retries still
/// gets a single delay so it has something to repeat.
pub fn delay_table(policy: &BackoffPolicy) -> Vec<Duration> {
    let mut delays: Vec<Duration> = (0..policy.retries)
        .map(|index| calculate_delay(policy, index, random_factor(policy.randomize)))
        .collect();

    if policy.forever && delays.is_empty() {
        delays.push(calculate_delay(
            policy,
            policy.retries,
            random_factor(policy.randomize),
        ));
    }

    delays.sort();
    delays
}
