use std::fmt;
use std::future::Future;
use std::time::Duration;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};

#[doc(inline)]
pub use backoff::Error as RetryError;

/// The default interval before the first retry.
const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(500);
/// The default factor by which the interval grows after each failed attempt.
const DEFAULT_MULTIPLIER: f64 = 1.5;
/// The default jitter applied to every interval, as a fraction of the interval.
const DEFAULT_RANDOMIZATION: f64 = 0.5;
/// The default upper bound for a single interval.
const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(60);
/// The default total time budget for all attempts, measured from the first attempt.
const DEFAULT_MAX_ELAPSED_TIME: Duration = Duration::from_secs(10);

/// An exponential backoff schedule bounded by a total elapsed-time budget.
///
/// The policy is a plain value. Every call to [`retry`] creates a fresh backoff state from it, so
/// a policy can be shared across any number of independent operations.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use statsdog_common::RetryPolicy;
///
/// let policy = RetryPolicy::default().with_max_elapsed_time(Duration::from_secs(3));
/// assert_eq!(policy.max_elapsed_time, Duration::from_secs(3));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// The interval before the first retry.
    pub initial_interval: Duration,
    /// The factor by which the interval grows after each failed attempt.
    pub multiplier: f64,
    /// Jitter applied to every interval, as a fraction of the interval in `[0, 1]`.
    pub randomization_factor: f64,
    /// The upper bound for a single interval.
    pub max_interval: Duration,
    /// The total time budget, after which the last error is surfaced.
    pub max_elapsed_time: Duration,
}

impl RetryPolicy {
    /// Returns a copy of this policy with a different elapsed-time budget.
    pub fn with_max_elapsed_time(mut self, max_elapsed_time: Duration) -> Self {
        self.max_elapsed_time = max_elapsed_time;
        self
    }

    /// Returns a copy of this policy with a different initial interval.
    pub fn with_initial_interval(mut self, initial_interval: Duration) -> Self {
        self.initial_interval = initial_interval;
        self
    }

    /// Creates a fresh backoff state. The elapsed-time budget starts counting now.
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_multiplier(self.multiplier)
            .with_randomization_factor(self.randomization_factor)
            .with_max_interval(self.max_interval)
            .with_max_elapsed_time(Some(self.max_elapsed_time))
            .build()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: DEFAULT_INITIAL_INTERVAL,
            multiplier: DEFAULT_MULTIPLIER,
            randomization_factor: DEFAULT_RANDOMIZATION,
            max_interval: DEFAULT_MAX_INTERVAL,
            max_elapsed_time: DEFAULT_MAX_ELAPSED_TIME,
        }
    }
}

/// Runs `operation` until it succeeds, fails permanently, or the policy's budget runs out.
///
/// The operation signals retryable failures with [`RetryError::transient`] and fatal failures with
/// [`RetryError::permanent`]. Once the elapsed-time budget is exhausted, the last transient error
/// is returned.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, operation: F) -> Result<T, E>
where
    E: fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RetryError<E>>>,
{
    let notify = |error: E, delay: Duration| {
        statsdog_log::trace!("attempt failed, retrying in {delay:?}: {error}");
    };

    backoff::future::retry_notify(policy.backoff(), operation, notify).await
}
