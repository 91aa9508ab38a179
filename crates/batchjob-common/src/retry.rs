//! Exponential backoff
//!
//! [`retry_with_backoff_if`] retries an operation in place, which suits short
//! races such as resourceVersion conflicts. Controllers that reschedule work
//! instead of sleeping use [`RetryConfig::delay_for`] and
//! [`RetryConfig::exhausted`] with their own failure counter.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

/// Backoff parameters shared by in-place retries and controller requeues
#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// Attempt budget; 0 retries forever
    pub max_attempts: u32,
    /// Delay after the first failure
    pub initial_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Growth factor applied per consecutive failure
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay after the `failures`-th consecutive failure, without jitter
    ///
    /// `initial_delay * multiplier^(failures - 1)`, capped at `max_delay`.
    pub fn delay_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(32) as i32;
        let scaled = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::from_secs_f64(scaled.min(self.max_delay.as_secs_f64()))
    }

    /// True once `attempts` reaches a non-zero budget
    pub fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts != 0 && attempts >= self.max_attempts
    }

    /// `delay_for` spread over [0.5, 1.5) so racing writers do not retry in lockstep
    fn jittered(&self, failures: u32) -> Duration {
        self.delay_for(failures)
            .mul_f64(rand::thread_rng().gen_range(0.5..1.5))
    }
}

/// Run `operation` until it succeeds, fails with an error `is_transient`
/// rejects, or the attempt budget is spent
///
/// The error returned is the last one observed.
pub async fn retry_with_backoff_if<T, E, Op, Fut, P>(
    config: &RetryConfig,
    operation_name: &str,
    is_transient: P,
    mut operation: Op,
) -> Result<T, E>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut failures = 0u32;
    loop {
        let err = match operation().await {
            Ok(value) => {
                if failures > 0 {
                    debug!(operation = operation_name, failures, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        failures += 1;
        if !is_transient(&err) || config.exhausted(failures) {
            return Err(err);
        }

        let delay = config.jittered(failures);
        warn!(
            operation = operation_name,
            attempt = failures,
            error = %err,
            delay_ms = delay.as_millis() as u64,
            "retrying"
        );
        tokio::time::sleep(delay).await;
    }
}
