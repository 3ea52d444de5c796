//! # retried-backoff
//!
//! Backoff operations for the `retried` retry controller:
//! - [`BackoffPolicy`]: retry budget and delay parameters (serde-friendly)
//! - [`BackoffOperation`]: the narrow interface the controller drives
//! - [`ExponentialBackoff`]: the default operation, with `forever` and
//!   retry-time limits and main-error tracking
//! - [`calculate_delay`] / [`delay_table`]: the delay formulas

pub mod error;
pub mod operation;
pub mod policy;
pub mod strategies;

pub use error::{BackoffError, Result};
pub use operation::{BackoffOperation, ExponentialBackoff};
pub use policy::{BackoffPolicy, BackoffStrategy};
pub use strategies::{calculate_delay, delay_table, random_factor};
