//! Retry policy.
//!
//! [`RetryPolicy::should_retry`] is a pure function of the attempt number and
//! the error, so one policy value can be shared by any number of concurrent
//! dispatches. [`RetryPolicy::wrap`] drives a producer with it.

use courier_common_async::CancellationWatcher;
use courier_common_config::{BackoffKind, RetrySettings};
use courier_common_http::TransportError;
use courier_common_log::spans;
use std::future::Future;
use std::time::Duration;
use tracing::Instrument;

use crate::error::{DispatchError, Result};

/// Delay curve between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// No delay.
    Immediate,
    /// Same delay before every retry.
    Fixed(Duration),
    /// `initial * multiplier^n` before retry `n`, capped at `max`.
    Exponential {
        /// Delay before the first retry.
        initial: Duration,
        /// Growth factor per retry, at least 1.0.
        multiplier: f64,
        /// Upper bound for any single delay.
        max: Duration,
    },
}

impl Backoff {
    /// Delay after failed attempt `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Immediate => Duration::ZERO,
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential {
                initial,
                multiplier,
                max,
            } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let secs = initial.as_secs_f64() * multiplier.powi(exponent);
                if !secs.is_finite() || secs >= max.as_secs_f64() {
                    max
                } else {
                    Duration::from_secs_f64(secs.max(0.0))
                }
            }
        }
    }

    /// Longest delay this curve ever produces.
    pub fn max_delay(&self) -> Duration {
        match *self {
            Backoff::Immediate => Duration::ZERO,
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { max, .. } => max,
        }
    }
}

/// One failed attempt, as seen by the policy.
#[derive(Debug, Clone, Copy)]
pub struct Attempt<'a> {
    number: u32,
    error: &'a TransportError,
}

impl<'a> Attempt<'a> {
    /// `number` counts from 0 for the first call.
    pub fn new(number: u32, error: &'a TransportError) -> Self {
        Self { number, error }
    }

    /// 0-based attempt number.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Error the attempt failed with.
    pub fn error(&self) -> &'a TransportError {
        self.error
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Issue the request again after the delay.
    Retry(Duration),
    /// Stop and surface the error.
    GiveUp,
}

/// Bounded retry with a configurable delay curve.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    /// Create a policy allowing at most `max_attempts` transport calls.
    pub fn new(max_attempts: u32, backoff: Backoff) -> Result<Self> {
        if max_attempts == 0 {
            return Err(DispatchError::Config(
                "max_attempts must be greater than 0".to_string(),
            ));
        }
        if let Backoff::Exponential { multiplier, .. } = backoff {
            if multiplier.is_nan() || multiplier < 1.0 {
                return Err(DispatchError::Config(format!(
                    "multiplier must be at least 1.0 (got {multiplier})"
                )));
            }
        }
        Ok(Self {
            max_attempts,
            backoff,
        })
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            backoff: Backoff::Immediate,
        }
    }

    /// Build from configuration.
    pub fn from_settings(settings: &RetrySettings) -> Result<Self> {
        let initial = Duration::from_millis(settings.initial_delay_ms);
        let backoff = match settings.backoff {
            BackoffKind::Immediate => Backoff::Immediate,
            BackoffKind::Fixed => Backoff::Fixed(initial),
            BackoffKind::Exponential => Backoff::Exponential {
                initial,
                multiplier: settings.multiplier,
                max: Duration::from_millis(settings.max_delay_ms),
            },
        };
        Self::new(settings.max_attempts, backoff)
    }

    /// Attempt ceiling.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay curve.
    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Decide whether to retry after `attempt` failed.
    ///
    /// A rate-limit hint from the server can lengthen the delay up to
    /// [`Backoff::max_delay`] but never shortens it.
    pub fn should_retry(&self, attempt: &Attempt<'_>) -> RetryDecision {
        if attempt.number().saturating_add(1) >= self.max_attempts {
            return RetryDecision::GiveUp;
        }

        let delay = self.backoff.delay(attempt.number());
        let delay = match attempt.error().retry_after() {
            Some(hint) => delay.max(hint.min(self.backoff.max_delay())),
            None => delay,
        };
        RetryDecision::Retry(delay)
    }

    /// Run `producer` until it succeeds, the policy gives up, or `cancel`
    /// fires.
    ///
    /// Each retry calls `producer` again for a fresh future. Only the last
    /// error is reported, wrapped in [`DispatchError::RetryExhausted`].
    /// Cancellation drops any in-flight attempt and returns
    /// [`DispatchError::Cancelled`].
    pub async fn wrap<T, F, Fut>(&self, mut producer: F, mut cancel: CancellationWatcher) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, TransportError>>,
    {
        let mut number = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(DispatchError::Cancelled);
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DispatchError::Cancelled),
                outcome = producer().instrument(spans::attempt_span(number)) => outcome,
            };

            let error = match outcome {
                Ok(value) => {
                    tracing::Span::current().record("attempts", number + 1);
                    return Ok(value);
                }
                Err(error) => error,
            };

            match self.should_retry(&Attempt::new(number, &error)) {
                RetryDecision::GiveUp => {
                    tracing::Span::current().record("attempts", number + 1);
                    tracing::info!(attempts = number + 1, error = %error, "giving up");
                    return Err(DispatchError::RetryExhausted {
                        attempts: number + 1,
                        last: error,
                    });
                }
                RetryDecision::Retry(delay) => {
                    tracing::warn!(
                        attempt = number,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "attempt failed, retrying"
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(DispatchError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    number += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Exponential {
                initial: Duration::from_millis(500),
                multiplier: 2.0,
                max: Duration::from_secs(10),
            },
        }
    }
}
