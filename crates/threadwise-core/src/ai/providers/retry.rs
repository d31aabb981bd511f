//! Retry of transient backend failures, bounded by the backend's `max_retries`.

use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Failure of a single request to a backend
#[derive(Debug)]
pub(crate) struct AttemptError {
    pub message: String,
    pub transient: bool,
}

impl AttemptError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: true,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: false,
        }
    }

    /// Timeouts and connection failures are worth another attempt
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let transient = err.is_timeout() || err.is_connect();
        Self {
            message: err.to_string(),
            transient,
        }
    }
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Rate limiting and server-side errors
pub(crate) fn is_transient_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Calculate exponential backoff delay for retry attempt
///
/// Base delay: 200ms, doubling each attempt
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(200 * 2u64.pow(attempt.saturating_sub(1).min(10)))
}

/// Run `operation`, retrying transient failures up to `max_retries` times
pub(crate) async fn with_retry<F, Fut, T>(
    provider: &str,
    max_retries: u32,
    operation: F,
) -> std::result::Result<T, AttemptError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = std::result::Result<T, AttemptError>>,
{
    let mut attempts = 0;
    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if e.transient && attempts < max_retries => {
                attempts += 1;
                let delay = backoff_delay(attempts);
                tracing::debug!(
                    provider = %provider,
                    error = %e,
                    attempt = attempts,
                    max_retries = max_retries,
                    delay_ms = delay.as_millis(),
                    "Transient provider error, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
