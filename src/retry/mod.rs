//! Backoff scheduler for fallible provider calls.
//!
//! Runs an async operation, classifies each failure by substring match on its
//! rendered message, and retries transient failures with an exponentially
//! growing, capped delay. Non-transient failures fail fast: no sleep, no
//! further attempts.
//!
//! ```
//! use regis::retry::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy {
//!     max_retries: 6,
//!     initial_delay: Duration::from_secs(1),
//!     max_delay: Duration::from_secs(10),
//!     backoff_factor: 2.0,
//!     ..RetryPolicy::default()
//! };
//! let waits: Vec<u64> = policy.delays().take(6).map(|d| d.as_secs()).collect();
//! assert_eq!(waits, vec![1, 2, 4, 8, 10, 10]);
//! ```

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Error-message markers that identify a transient failure.
pub const DEFAULT_RETRYABLE_SIGNATURES: &[&str] = &[
    "rate limit",
    "timeout",
    "connection",
    "429",
    "503",
    "504",
    "overloaded",
];

/// Result of classifying a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub retryable: bool,
}

/// Classify an error message against a set of transient-failure markers.
///
/// Matching is a case-insensitive substring search.
pub fn classify<S: AsRef<str>>(message: &str, signatures: &[S]) -> Classification {
    let message = message.to_lowercase();
    let retryable = signatures
        .iter()
        .any(|sig| message.contains(&sig.as_ref().to_lowercase()));
    Classification { retryable }
}

/// Retry configuration for one call site.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each failed attempt (> 1).
    pub backoff_factor: f64,
    pub retryable_signatures: Vec<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_factor: 2.0,
            retryable_signatures: DEFAULT_RETRYABLE_SIGNATURES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl RetryPolicy {
    /// Policy with no retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn classify<E: fmt::Display + ?Sized>(&self, error: &E) -> Classification {
        classify(&error.to_string(), &self.retryable_signatures)
    }

    /// The waits inserted before attempts 2, 3, ... (unbounded).
    pub fn delays(&self) -> BackoffDelays {
        BackoffDelays {
            current: self.initial_delay,
            max: self.max_delay,
            factor: self.backoff_factor,
        }
    }

    /// Check the policy's invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.initial_delay.is_zero() {
            return Err("initial delay must be positive".to_string());
        }
        if self.initial_delay > self.max_delay {
            return Err("initial delay must not exceed max delay".to_string());
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor <= 1.0 {
            return Err("backoff factor must be greater than 1".to_string());
        }
        Ok(())
    }
}

/// Iterator over capped exponential delays.
#[derive(Debug, Clone)]
pub struct BackoffDelays {
    current: Duration,
    max: Duration,
    factor: f64,
}

impl Iterator for BackoffDelays {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let delay = self.current.min(self.max);
        // Clamp the running value so repeated growth cannot overflow.
        self.current = if self.current >= self.max {
            self.max
        } else {
            Duration::try_from_secs_f64(self.current.as_secs_f64() * self.factor)
                .map_or(self.max, |next| next.min(self.max))
        };
        Some(delay)
    }
}

/// Run `operation` under `policy`.
///
/// Returns the first success, the first non-retryable failure, or the last
/// failure once `max_retries` retries have been spent.
pub async fn retry_with_backoff<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut delays = policy.delays();
    let mut attempt: u32 = 0;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !policy.classify(&err).retryable {
            debug!(attempt = attempt + 1, error = %err, "Non-retryable failure");
            return Err(err);
        }

        if attempt >= policy.max_retries {
            if policy.max_retries > 0 {
                warn!(
                    attempts = attempt + 1,
                    error = %err,
                    "All retries exhausted"
                );
            }
            return Err(err);
        }

        let delay = delays.next().unwrap_or(policy.max_delay);
        attempt += 1;
        warn!(
            attempt,
            max_retries = policy.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Retryable failure, backing off"
        );
        tokio::time::sleep(delay).await;
    }
}
