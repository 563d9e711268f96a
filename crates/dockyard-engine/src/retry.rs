//! Bounded retry with exponential backoff and jitter.
//!
//! Unlike a plain retry loop this one has a hard deadline and observes a
//! [`CancellationToken`], so a peer that never comes up cannot hang the pass.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How long and how often to retry.
#[derive(Clone, Debug)]
pub struct Backoff {
    /// Delay after the first failure.
    pub initial_delay: Duration,
    /// Upper bound for a single delay.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
    /// Give up once this much time has passed since the first attempt.
    pub deadline: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            multiplier: 2.0,
            deadline: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("gave up after {attempts} attempts: {last}")]
    DeadlineExceeded { attempts: u32, last: E },

    #[error("cancelled")]
    Cancelled,
}

/// Runs `operation` until it succeeds, the deadline passes, or `cancel` fires.
///
/// # Errors
///
/// Returns [`RetryError::DeadlineExceeded`] with the last error, or
/// [`RetryError::Cancelled`].
pub async fn retry_until<F, Fut, T, E>(
    backoff: &Backoff,
    cancel: &CancellationToken,
    operation_name: &str,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let started = Instant::now();
    let mut attempt = 0u32;
    let mut delay = backoff.initial_delay;

    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }
        attempt += 1;

        let last = match operation().await {
            Ok(value) => {
                debug!(operation = %operation_name, attempt, "Operation succeeded");
                return Ok(value);
            }
            Err(e) => e,
        };

        let elapsed = started.elapsed();
        if elapsed >= backoff.deadline {
            warn!(
                operation = %operation_name,
                attempt,
                error = %last,
                "Operation did not succeed before the deadline"
            );
            return Err(RetryError::DeadlineExceeded {
                attempts: attempt,
                last,
            });
        }

        // 0.5x to 1.5x, never past the deadline
        let jitter = rand::thread_rng().gen_range(0.5..1.5);
        let sleep = Duration::from_secs_f64(delay.as_secs_f64() * jitter)
            .min(backoff.deadline.saturating_sub(elapsed));

        debug!(
            operation = %operation_name,
            attempt,
            error = %last,
            delay_ms = sleep.as_millis(),
            "Operation failed, retrying"
        );

        tokio::select! {
            () = cancel.cancelled() => return Err(RetryError::Cancelled),
            () = tokio::time::sleep(sleep) => {}
        }

        delay = Duration::from_secs_f64(
            (delay.as_secs_f64() * backoff.multiplier).min(backoff.max_delay.as_secs_f64()),
        );
    }
}
