//! Exponential backoff around a throttled upstream call

use std::{future::Future, time::Duration};

use serde::{Deserialize, Serialize};

use super::providers::ProviderError;

/// Backoff settings for rate-limited calls.
///
/// The wait before retry `n` (0-based) is `base_delay_ms * 2^n`: 2s, 4s, 8s with
/// the defaults. No jitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 2000,
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms.saturating_mul(1u64 << attempt.min(32)))
    }
}

/// Run `api_call`, retrying only on [`ProviderError::RateLimited`].
///
/// Any other error is returned at once. After `max_retries` throttled retries
/// the last rate-limit error is returned.
pub async fn call_with_retry<T, F, Fut>(policy: &RetryPolicy, mut api_call: F) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0;
    loop {
        match api_call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_rate_limited() && attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    "[LLM_API] Rate limited, retrying in {}ms (attempt {}/{})",
                    delay.as_millis(),
                    attempt + 1,
                    policy.max_retries
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_rate_limited() {
                    tracing::error!("[LLM_API] Still rate limited after {} retries", attempt);
                }
                return Err(e);
            }
        }
    }
}
