//! Retry logic.
//!
//! # Responsibilities
//! - Decide per failure whether to retry (delegates to `classifier`)
//! - Wait a fixed delay between attempts
//! - Stop after the configured number of attempts and report exhaustion
//!
//! # Design Decisions
//! - Fixed delay, not exponential: total worst case is attempts × delay
//! - POST/PUT/PATCH are only retried with the `X-Retry-Safe` header
//! - Configuration is snapshotted per call; `set_retry_config` never affects
//!   a sequence already running

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use http::Method;
use thiserror::Error;

use crate::config::RetryConfig;
use crate::failure::RawFailure;
use crate::http::{RequestDescriptor, Response};
use crate::observability::metrics;
use crate::resilience::classifier::is_retryable;

/// Terminal outcome of a guarded request.
#[derive(Debug, Error)]
pub enum GuardError {
    /// The failure was not retryable; the original failure, unchanged.
    #[error(transparent)]
    Failed(RawFailure),

    /// Every allowed attempt failed with a retryable failure.
    #[error("max retry attempts reached after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: RawFailure },
}

impl GuardError {
    /// The underlying failure (the last one, for exhausted sequences).
    pub fn failure(&self) -> &RawFailure {
        match self {
            GuardError::Failed(f) => f,
            GuardError::RetriesExhausted { last, .. } => last,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, GuardError::RetriesExhausted { .. })
    }
}

/// Per-call retry state.
#[derive(Debug)]
struct RetryContext<'a> {
    attempt: u32,
    max_attempts: u32,
    delay: Duration,
    method: &'a Method,
    url: &'a str,
    retry_safe: bool,
}

impl<'a> RetryContext<'a> {
    fn new(request: &'a RequestDescriptor, config: &RetryConfig) -> Self {
        Self {
            attempt: 0,
            max_attempts: config.max_attempts.max(1),
            delay: Duration::from_millis(config.delay_ms),
            method: &request.method,
            url: request.url.as_str(),
            retry_safe: request.has_retry_safe_header(),
        }
    }
}

/// Bounded, classified retries over one request pipeline.
#[derive(Debug)]
pub struct RetryPolicy {
    config: ArcSwap<RetryConfig>,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
        }
    }

    /// Current defaults.
    pub fn config(&self) -> Arc<RetryConfig> {
        self.config.load_full()
    }

    /// Change the defaults used by subsequent calls.
    pub fn set_retry_config(&self, attempts: u32, delay: Duration) {
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.apply(RetryConfig {
            max_attempts: attempts,
            delay_ms,
        });
    }

    /// Replace the whole retry configuration.
    pub fn apply(&self, config: RetryConfig) {
        tracing::info!(
            max_attempts = config.max_attempts,
            delay_ms = config.delay_ms,
            "Retry configuration updated"
        );
        self.config.store(Arc::new(config));
    }

    /// Run `send` until it succeeds, fails permanently, or runs out of attempts.
    pub async fn execute<F, Fut>(
        &self,
        request: &RequestDescriptor,
        mut send: F,
    ) -> Result<Response, GuardError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Response, RawFailure>>,
    {
        let config = self.config.load_full();
        let mut ctx = RetryContext::new(request, &config);
        drop(config);

        loop {
            ctx.attempt += 1;

            let failure = match send().await {
                Ok(response) => return Ok(response),
                Err(failure) => failure,
            };

            let Some(status) = failure.status() else {
                return Err(GuardError::Failed(failure));
            };
            if !is_retryable(status, ctx.method, ctx.retry_safe) {
                tracing::debug!(
                    url = %ctx.url,
                    status,
                    attempt = ctx.attempt,
                    "Failure is not retryable"
                );
                return Err(GuardError::Failed(failure));
            }

            if ctx.attempt >= ctx.max_attempts {
                tracing::warn!(
                    url = %ctx.url,
                    status,
                    attempts = ctx.attempt,
                    "Max retry attempts reached"
                );
                metrics::record_retries_exhausted(ctx.method.as_str());
                return Err(GuardError::RetriesExhausted {
                    attempts: ctx.attempt,
                    last: failure,
                });
            }

            tracing::info!(
                url = %ctx.url,
                status,
                attempt = ctx.attempt,
                delay = ?ctx.delay,
                "Retrying request"
            );
            metrics::record_retry(ctx.method.as_str(), status);
            tokio::time::sleep(ctx.delay).await;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}
