use crate::domain::{MembershipRow, PricePoint};
use crate::ingest::types::RawQuote;
use anyhow::Result;
use std::future::Future;
use std::time::Duration;

#[async_trait::async_trait]
pub trait MembershipProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn list_membership(&self) -> Result<Vec<MembershipRow>>;
}

#[async_trait::async_trait]
pub trait FundamentalsProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_quote(&self, symbol: &str) -> Result<RawQuote>;

    /// Daily closes, oldest first, covering the trailing `period_months`.
    async fn fetch_history(&self, symbol: &str, period_months: u32) -> Result<Vec<PricePoint>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Values below 1 behave as 1.
    pub max_attempts: u32,
    /// Fixed wait between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: crate::config::DEFAULT_FETCH_MAX_ATTEMPTS,
            backoff: Duration::from_millis(crate::config::DEFAULT_FETCH_BACKOFF_MS),
        }
    }
}

/// Runs `op` until it succeeds or the policy's attempt ceiling is reached, returning the last error.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(v) => return Ok(v),
            Err(err) => {
                if attempt >= max_attempts {
                    return Err(err);
                }
                tracing::warn!(
                    attempt,
                    max_attempts,
                    backoff = ?policy.backoff,
                    what,
                    error = %err,
                    "provider call failed; retrying"
                );
                if !policy.backoff.is_zero() {
                    tokio::time::sleep(policy.backoff).await;
                }
            }
        }
    }
}
