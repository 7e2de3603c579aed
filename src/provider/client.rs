//! Retrying, timeout-bounded structured generation

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;

use super::{LlmProvider, ProviderError, ResponseSchema, StructuredOutput};

/// Bounded exponential backoff
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(4),
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`, given that `attempt` just failed
    pub fn delay_after(&self, attempt: u32, error: &ProviderError) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let backoff = self.base_delay.saturating_mul(1 << exponent);
        let delay = match error {
            ProviderError::RateLimited {
                retry_after: Some(hint),
            } => backoff.max(*hint),
            _ => backoff,
        };
        delay.min(self.max_delay)
    }
}

/// Provider handle used by the analysis stages
#[derive(Clone)]
pub struct ProviderClient {
    provider: Arc<dyn LlmProvider>,
    retry: RetryPolicy,
    call_timeout: Duration,
}

impl ProviderClient {
    pub fn new(provider: Arc<dyn LlmProvider>, retry: RetryPolicy, call_timeout: Duration) -> Self {
        Self {
            provider,
            retry,
            call_timeout,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Generate a `T` from a rendered prompt
    ///
    /// Malformed output, timeouts, rate limits and unavailability are retried
    /// with backoff up to `max_attempts`; rejections fail immediately.
    pub async fn generate<T: StructuredOutput>(&self, prompt: &str) -> Result<T, ProviderError> {
        let schema = ResponseSchema::of::<T>();
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let start_time = Instant::now();

            let result = match tokio::time::timeout(
                self.call_timeout,
                self.provider.generate(prompt, &schema),
            )
            .await
            {
                Ok(outcome) => outcome.and_then(decode::<T>),
                Err(_) => Err(ProviderError::Timeout(self.call_timeout)),
            };

            let elapsed = start_time.elapsed();

            match result {
                Ok(output) => {
                    tracing::info!(
                        provider = self.provider.name(),
                        model = %self.provider.model(),
                        schema = schema.name,
                        attempt = attempt,
                        elapsed_ms = elapsed.as_millis(),
                        prompt_length = prompt.len(),
                        "Provider call completed successfully"
                    );
                    return Ok(output);
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.retry.delay_after(attempt, &e);
                    tracing::warn!(
                        provider = self.provider.name(),
                        schema = schema.name,
                        attempt = attempt,
                        max_attempts = max_attempts,
                        elapsed_ms = elapsed.as_millis(),
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "Provider call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(
                        provider = self.provider.name(),
                        model = %self.provider.model(),
                        schema = schema.name,
                        attempt = attempt,
                        elapsed_ms = elapsed.as_millis(),
                        error = %e,
                        "Provider call failed"
                    );
                    return Err(e);
                }
            }
        }
    }
}

fn decode<T: StructuredOutput>(value: Value) -> Result<T, ProviderError> {
    let output: T = serde_json::from_value(value).map_err(|e| {
        ProviderError::MalformedOutput(format!("{} output does not match schema: {}", T::NAME, e))
    })?;
    output
        .validate()
        .map_err(|e| ProviderError::MalformedOutput(format!("{}: {}", T::NAME, e)))?;
    Ok(output)
}
