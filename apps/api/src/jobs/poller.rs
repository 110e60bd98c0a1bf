//! Cancellable polling with exponential backoff and an overall deadline.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep_until, timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub multiplier: u32,
    pub max_interval: Duration,
    /// Total time budget measured from the start of polling.
    pub deadline: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(2),
            multiplier: 2,
            max_interval: Duration::from_secs(30),
            deadline: Duration::from_secs(300),
        }
    }
}

impl BackoffPolicy {
    pub fn with_deadline(deadline: Duration) -> Self {
        Self {
            deadline,
            ..Self::default()
        }
    }

    /// Wait before attempt `attempt + 1` (zero-based).
    pub fn interval_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt);
        self.initial.saturating_mul(factor).min(self.max_interval)
    }
}

pub enum PollStatus<T> {
    Ready(T),
    Pending,
}

#[derive(Debug, Error)]
pub enum PollError<E> {
    #[error("gave up after {attempts} attempts: deadline of {deadline:?} reached")]
    DeadlineExceeded { attempts: u32, deadline: Duration },

    #[error("cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },

    #[error(transparent)]
    Check(E),
}

/// Calls `check` until it reports `Ready`, sleeping between attempts per
/// `policy`. The first check happens after the first interval.
///
/// Stops with `DeadlineExceeded` when the next attempt would start after the
/// deadline (an in-flight check is also cut off at the deadline), with
/// `Cancelled` as soon as `cancel` fires, and with `Check` on the first
/// error returned by `check`.
pub async fn poll_until<T, E, F, Fut>(
    policy: &BackoffPolicy,
    cancel: &CancellationToken,
    mut check: F,
) -> Result<T, PollError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<PollStatus<T>, E>>,
{
    let deadline = Instant::now() + policy.deadline;
    let mut attempts: u32 = 0;

    loop {
        let wake = Instant::now() + policy.interval_for(attempts);
        if wake > deadline {
            return Err(PollError::DeadlineExceeded {
                attempts,
                deadline: policy.deadline,
            });
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PollError::Cancelled { attempts }),
            _ = sleep_until(wake) => {}
        }

        attempts += 1;
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PollError::Cancelled { attempts }),
            outcome = timeout_at(deadline, check(attempts)) => outcome,
        };

        match outcome {
            Err(_elapsed) => {
                return Err(PollError::DeadlineExceeded {
                    attempts,
                    deadline: policy.deadline,
                })
            }
            Ok(Err(e)) => return Err(PollError::Check(e)),
            Ok(Ok(PollStatus::Ready(value))) => return Ok(value),
            Ok(Ok(PollStatus::Pending)) => debug!("Poll attempt {attempts} still pending"),
        }
    }
}
