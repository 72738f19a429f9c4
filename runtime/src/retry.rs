//! Retry decorator with exponential backoff.
//!
//! [`WithRetry`] re-runs the inner handler while it fails with a retryable
//! error (lock contention). Every other error is returned on the first attempt.
//! Backoff delays are cancellable.
//!
//! # Example
//!
//! ```rust
//! use employer_incentives_runtime::retry::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::builder()
//!     .max_retries(5)
//!     .initial_delay(Duration::from_millis(100))
//!     .max_delay(Duration::from_secs(10))
//!     .multiplier(2.0)
//!     .build();
//!
//! assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
//! ```

use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::command::Command;
use crate::error::CommandError;
use crate::handler::{CommandHandler, HandlerFuture};
use crate::metrics::PipelineMetrics;

/// Retry policy configuration for exponential backoff.
///
/// # Default Values
///
/// - `max_retries`: 3
/// - `initial_delay`: 100ms
/// - `max_delay`: 30 seconds
/// - `multiplier`: 2.0 (delay doubles each retry)
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first
    pub max_retries: usize,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries (cap for exponential backoff)
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Create a new policy builder.
    #[must_use]
    pub const fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder {
            max_retries: Some(3),
            initial_delay: Some(Duration::from_millis(100)),
            max_delay: Some(Duration::from_secs(30)),
            multiplier: Some(2.0),
        }
    }

    /// Calculate delay for a given attempt number.
    ///
    /// Uses exponential backoff: delay = `initial_delay` * (multiplier ^ attempt),
    /// capped at `max_delay`.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap
    )]
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return self.initial_delay;
        }

        let delay_ms =
            self.initial_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);

        let delay = Duration::from_millis(delay_ms as u64);

        if delay > self.max_delay {
            self.max_delay
        } else {
            delay
        }
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    max_retries: Option<usize>,
    initial_delay: Option<Duration>,
    max_delay: Option<Duration>,
    multiplier: Option<f64>,
}

impl RetryPolicyBuilder {
    /// Set maximum number of retries.
    #[must_use]
    pub const fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Set initial delay before first retry.
    #[must_use]
    pub const fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Set maximum delay (cap for exponential backoff).
    #[must_use]
    pub const fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set multiplier for exponential backoff.
    #[must_use]
    pub const fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    /// Build the [`RetryPolicy`].
    #[must_use]
    pub fn build(self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries.unwrap_or(3),
            initial_delay: self.initial_delay.unwrap_or(Duration::from_millis(100)),
            max_delay: self.max_delay.unwrap_or(Duration::from_secs(30)),
            multiplier: self.multiplier.unwrap_or(2.0),
        }
    }
}

/// Re-invokes the inner handler on lock contention.
pub struct WithRetry<H> {
    inner: H,
    policy: RetryPolicy,
}

impl<H> WithRetry<H> {
    /// Wraps `inner` with `policy`.
    #[must_use]
    pub const fn new(inner: H, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<C: Command, H: CommandHandler<C>> CommandHandler<C> for WithRetry<H> {
    fn handle<'a>(&'a self, command: &'a C, cancel: &'a CancellationToken) -> HandlerFuture<'a> {
        Box::pin(async move {
            let command_type = command.command_type();
            let mut attempt = 0;

            loop {
                match self.inner.handle(command, cancel).await {
                    Ok(()) => {
                        if attempt > 0 {
                            tracing::info!(
                                command = command_type,
                                attempt,
                                "Command succeeded after retry"
                            );
                        }
                        return Ok(());
                    }
                    Err(err) if !err.is_retryable() => return Err(err),
                    Err(err) => {
                        if attempt >= self.policy.max_retries {
                            tracing::error!(
                                command = command_type,
                                attempt,
                                error = %err,
                                "Command failed after max retries"
                            );
                            return Err(err);
                        }

                        let delay = self.policy.delay_for_attempt(attempt);
                        tracing::warn!(
                            command = command_type,
                            attempt,
                            delay_ms = delay.as_millis(),
                            error = %err,
                            "Command failed, retrying..."
                        );
                        PipelineMetrics::record_retry(command_type);

                        tokio::select! {
                            () = cancel.cancelled() => return Err(CommandError::Cancelled),
                            () = sleep(delay) => {}
                        }
                        attempt += 1;
                    }
                }
            }
        })
    }
}
