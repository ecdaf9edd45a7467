use reqwest::StatusCode;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Bounded retry policy for webhook delivery.
///
/// Delay grows as `2^attempt` seconds after the 1st, 2nd, ... attempt
/// (2s, 4s, 8s). Only server-side failures are considered transient.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// Production webhook policy: 3 attempts, so delays of 2s then 4s.
    pub fn webhook_default() -> Self {
        Self { max_attempts: 3 }
    }

    /// Delay to wait after the given 1-based attempt before retrying.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        Duration::from_secs(2u64.saturating_pow(attempt))
    }

    /// 5xx is transient and worth retrying; 4xx is a client error and is not.
    pub fn is_retryable_status(&self, status: StatusCode) -> bool {
        status.is_server_error()
    }
}

/// Injected sleep so retry behavior can be unit-tested without real delays.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Production sleeper backed by the tokio timer.
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(tokio::time::sleep(duration))
    }
}
