//! Retry policy for remote annotation calls.
//!
//! The default policy never gives up on a row: every failure is logged, followed
//! by a fixed 30 second pause, and the call is repeated. Stricter policies can
//! cap attempts or elapsed time, grow the delay exponentially, and stop early
//! on errors that cannot succeed on a later attempt.

use crate::error::{AnnoError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

/// Default pause between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Same pause before every retry.
    Fixed(Duration),
    /// `initial * multiplier^(n-1)` before the n-th retry, capped at `max`.
    Exponential {
        initial: Duration,
        multiplier: f64,
        max: Duration,
    },
}

impl Backoff {
    /// Pause before retry number `retry` (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential {
                initial,
                multiplier,
                max,
            } => {
                let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
                let secs = initial.as_secs_f64() * multiplier.powi(exponent);
                if !secs.is_finite() || secs >= max.as_secs_f64() {
                    max
                } else if secs <= 0.0 {
                    Duration::ZERO
                } else {
                    Duration::from_secs_f64(secs)
                }
            }
        }
    }
}

/// When and how often to repeat a failed call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first. None = unbounded.
    pub max_attempts: Option<u32>,
    /// Stop once the next pause would exceed this much time since the first attempt.
    pub max_elapsed: Option<Duration>,
    pub backoff: Backoff,
    /// Retry errors classified as fatal too.
    pub retry_fatal: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            max_elapsed: None,
            backoff: Backoff::Fixed(DEFAULT_RETRY_DELAY),
            retry_fatal: true,
        }
    }
}

impl RetryPolicy {
    /// Policy that gives up after `max_attempts` tries.
    pub fn bounded(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            max_elapsed: None,
            backoff,
            retry_fatal: false,
        }
    }

    /// Whether this policy can ever give up.
    pub fn is_unbounded(&self) -> bool {
        self.max_attempts.is_none() && self.max_elapsed.is_none() && self.retry_fatal
    }

    /// Run `op` until it succeeds or the policy gives up.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<F, Fut, T>(&self, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt = attempt.saturating_add(1);

            let err = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !self.retry_fatal && !err.is_retryable() {
                warn!("Attempt {} failed with non-retryable error: {}", attempt, err);
                return Err(err);
            }

            if self.max_attempts.is_some_and(|max| attempt >= max) {
                return Err(AnnoError::RetriesExhausted {
                    attempts: attempt,
                    last: err.to_string(),
                });
            }

            let delay = self.backoff.delay(attempt);
            if let Some(max_elapsed) = self.max_elapsed {
                if started.elapsed() + delay > max_elapsed {
                    return Err(AnnoError::RetriesExhausted {
                        attempts: attempt,
                        last: err.to_string(),
                    });
                }
            }

            warn!(
                "Attempt {} failed: {}. Retrying in {:.0}s",
                attempt,
                err,
                delay.as_secs_f64()
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> AnnoError {
        AnnoError::Api {
            status: 529,
            message: "overloaded_error".to_string(),
        }
    }

    #[test]
    fn test_exponential_backoff_caps() {
        let backoff = Backoff::Exponential {
            initial: Duration::from_secs(1),
            multiplier: 2.0,
            max: Duration::from_secs(10),
        };
        assert_eq!(backoff.delay(1), Duration::from_secs(1));
        assert_eq!(backoff.delay(3), Duration::from_secs(4));
        assert_eq!(backoff.delay(5), Duration::from_secs(10));
        assert_eq!(backoff.delay(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn test_negative_growth_never_goes_below_zero() {
        let backoff = Backoff::Exponential {
            initial: Duration::from_secs(1),
            multiplier: -2.0,
            max: Duration::from_secs(10),
        };
        assert_eq!(backoff.delay(2), Duration::ZERO);
        assert_eq!(backoff.delay(3), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_policy_pauses_thirty_seconds_between_attempts() {
        let calls = &AtomicU32::new(0);
        let started = Instant::now();

        let result = RetryPolicy::default()
            .run(|_| async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(transient())
                } else {
                    Ok("done")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(60) && waited < Duration::from_secs(61));
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_policy_retries_fatal_errors() {
        let calls = &AtomicU32::new(0);

        let result = RetryPolicy::default()
            .run(|_| async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(AnnoError::Api {
                        status: 401,
                        message: "bad key".to_string(),
                    })
                } else {
                    Ok(())
                }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_policy_gives_up() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::bounded(3, Backoff::Fixed(Duration::from_secs(1)));

        let result: Result<()> = policy
            .run(|_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(transient())
            })
            .await;

        assert!(matches!(
            result,
            Err(AnnoError::RetriesExhausted { attempts: 3, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_stops_classifying_policy() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::bounded(10, Backoff::Fixed(Duration::from_secs(1)));

        let result: Result<()> = policy
            .run(|_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AnnoError::Api {
                    status: 400,
                    message: "invalid_request_error".to_string(),
                })
            })
            .await;

        assert!(matches!(result, Err(AnnoError::Api { status: 400, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_elapsed_limits_retries() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy {
            max_elapsed: Some(Duration::from_secs(80)),
            ..RetryPolicy::default()
        };

        let result: Result<()> = policy
            .run(|_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(transient())
            })
            .await;

        // Pauses after 0s and 30s fit, the one after 60s would end past 80s.
        assert!(matches!(
            result,
            Err(AnnoError::RetriesExhausted { attempts: 3, .. })
        ));
        assert!(!policy.is_unbounded());
        assert!(RetryPolicy::default().is_unbounded());
    }
}
