use log::{error, warn};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Exponential backoff policy.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub exponential_base: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            exponential_base: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay to wait after the given failed attempt (1-based), capped at `max_delay`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.exponential_base.powi(attempt.saturating_sub(1) as i32);
        let millis = self.initial_delay.as_millis() as f64 * factor;
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

/// Short policy for the insight service; the caller has a local fallback.
pub fn insight_retry_config() -> RetryConfig {
    RetryConfig {
        max_attempts: 2,
        initial_delay: Duration::from_millis(500),
        max_delay: Duration::from_secs(2),
        exponential_base: 2.0,
    }
}

/// Runs `operation` until it succeeds or the attempts run out.
pub async fn retry_with_backoff<F, Fut, T, E>(config: &RetryConfig, operation_name: &str, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_with_backoff_if(config, operation_name, operation, |_| true).await
}

/// Like [`retry_with_backoff`], but gives up at once on errors `should_retry` rejects.
pub async fn retry_with_backoff_if<F, Fut, T, E, P>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 1;
    loop {
        let error = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    warn!("'{}' recovered on attempt {}", operation_name, attempt);
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        if !should_retry(&error) {
            warn!("'{}' failed permanently: {}", operation_name, error);
            return Err(error);
        }
        if attempt >= config.max_attempts {
            error!("'{}' gave up after {} attempts: {}", operation_name, attempt, error);
            return Err(error);
        }

        let delay = config.delay_after(attempt);
        warn!(
            "'{}' attempt {}/{} failed: {}. Next try in {:?}",
            operation_name, attempt, config.max_attempts, error, delay
        );
        sleep(delay).await;
        attempt += 1;
    }
}
