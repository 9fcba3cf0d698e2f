use crate::error::{CoreError, LlmError, SearchApiError};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// Retry behaviour for one external capability.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Base delay for exponential backoff (in milliseconds)
    pub base_delay_ms: u64,
    /// Maximum delay between retries (in milliseconds)
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    /// Maximum jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000, // 1 second
            max_delay_ms: 30000, // 30 seconds
            backoff_multiplier: 2.0,
            jitter_factor: 0.1, // 10% jitter
        }
    }
}

impl RetryPolicy {
    /// Search requests are budgeted, so a failed group is not retried.
    pub fn search() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 2000,
            max_delay_ms: 60000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.2,
        }
    }

    pub fn analysis() -> Self {
        Self {
            max_attempts: 2,
            base_delay_ms: 5000,
            max_delay_ms: 30000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }

    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

/// Retry strategy based on error type
#[derive(Debug, Clone, PartialEq)]
pub enum RetryStrategy {
    /// Retry with exponential backoff
    Retry,
    /// Retry after a delay the provider asked for
    RetryWithDelay(Duration),
    /// Don't retry (permanent failures, and search rate limits which the
    /// orchestrator answers with a cooldown)
    NoRetry,
}

pub fn get_retry_strategy(error: &CoreError) -> RetryStrategy {
    match error {
        CoreError::SearchApi(search_error) => match search_error {
            SearchApiError::RateLimitExceeded { .. } => RetryStrategy::NoRetry,
            SearchApiError::ServerError { .. } => RetryStrategy::Retry,
            SearchApiError::RequestTimeout => RetryStrategy::Retry,
            SearchApiError::EndpointUnavailable { .. } => RetryStrategy::Retry,
            SearchApiError::InvalidResponse { .. } => RetryStrategy::NoRetry,
            SearchApiError::AuthenticationFailed { .. } => RetryStrategy::NoRetry,
            SearchApiError::Forbidden { .. } => RetryStrategy::NoRetry,
            SearchApiError::InvalidQuery { .. } => RetryStrategy::NoRetry,
        },
        CoreError::Llm(llm_error) => match llm_error {
            LlmError::RateLimitExceeded { retry_after, .. } => {
                RetryStrategy::RetryWithDelay(Duration::from_secs(*retry_after))
            }
            LlmError::RequestTimeout { .. } => RetryStrategy::Retry,
            LlmError::ApiStatus { status_code, .. } if *status_code >= 500 => RetryStrategy::Retry,
            _ => RetryStrategy::NoRetry,
        },
        CoreError::Network(reqwest_error) => {
            if reqwest_error.is_timeout() || reqwest_error.is_connect() {
                RetryStrategy::Retry
            } else {
                RetryStrategy::NoRetry
            }
        }
        _ => RetryStrategy::NoRetry,
    }
}

/// Calculate delay with exponential backoff and jitter
pub fn calculate_delay(attempt: u32, policy: &RetryPolicy) -> Duration {
    let base_delay = Duration::from_millis(policy.base_delay_ms);
    let max_delay = Duration::from_millis(policy.max_delay_ms);

    let exponential_delay = if attempt == 0 {
        base_delay
    } else {
        let multiplier = policy.backoff_multiplier.powi(attempt as i32);
        let delay_ms = (policy.base_delay_ms as f64 * multiplier) as u64;
        Duration::from_millis(delay_ms.min(policy.max_delay_ms))
    };

    let jitter_range = (exponential_delay.as_millis() as f64 * policy.jitter_factor) as u64;
    let jitter = fastrand::u64(0..=jitter_range);
    let final_delay = exponential_delay + Duration::from_millis(jitter);

    final_delay.min(max_delay)
}

/// Wraps an operation with the retry policy. The last error is returned
/// unchanged so callers can still tell a rate limit from other failures.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn execute<F, Fut, T>(&self, operation_name: &str, operation: F) -> Result<T, CoreError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            if attempt > 0 {
                debug!("Retry attempt {} for {}", attempt, operation_name);
            }

            let error = match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        info!("Operation {} succeeded after {} retries", operation_name, attempt);
                    }
                    return Ok(result);
                }
                Err(error) => error,
            };

            let has_attempts_left = attempt + 1 < max_attempts;
            let delay = match get_retry_strategy(&error) {
                RetryStrategy::Retry if has_attempts_left => calculate_delay(attempt, &self.policy),
                RetryStrategy::RetryWithDelay(delay) if has_attempts_left => {
                    delay.min(Duration::from_millis(self.policy.max_delay_ms))
                }
                RetryStrategy::NoRetry => {
                    debug!("Not retrying {} due to error type: {}", operation_name, error);
                    return Err(error);
                }
                _ => {
                    if max_attempts > 1 {
                        error!(
                            "Operation {} failed after {} attempts: {}",
                            operation_name, max_attempts, error
                        );
                    }
                    return Err(error);
                }
            };

            info!("Retrying {} in {:?} due to: {}", operation_name, delay, error);
            sleep(delay).await;
            attempt += 1;
        }
    }
}
