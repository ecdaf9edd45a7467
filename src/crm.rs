use crate::errors::AppError;
use crate::models::CrmLeadPayload;
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};
use std::sync::Arc;
use std::time::Duration;

/// Client for the CRM lead-intake webhook.
#[derive(Clone)]
pub struct CrmClient {
    client: reqwest::Client,
    webhook_url: String,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl CrmClient {
    pub fn new(webhook_url: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create CRM client: {}", e))
            })?;

        Ok(Self {
            client,
            webhook_url,
            policy: RetryPolicy::webhook_default(),
            sleeper: Arc::new(TokioSleeper),
        })
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// POSTs the lead payload, retrying transient failures with exponential
    /// backoff.
    ///
    /// - 2xx returns immediately.
    /// - 5xx with attempts remaining sleeps `2^attempt` seconds and retries.
    /// - Any other status returns the response without retrying; the caller
    ///   must check the status. The same applies to a 5xx on the final
    ///   attempt.
    /// - A network error retries with the same backoff, except on the final
    ///   attempt where it propagates.
    pub async fn send_with_retry(
        &self,
        payload: &CrmLeadPayload,
    ) -> Result<reqwest::Response, AppError> {
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            tracing::info!(
                "Sending lead to CRM webhook (attempt {}/{})",
                attempt,
                max_attempts
            );

            match self
                .client
                .post(&self.webhook_url)
                .json(payload)
                .send()
                .await
            {
                Ok(response) => {
                    if response.status().is_success() {
                        return Ok(response);
                    }

                    if attempt < max_attempts && self.policy.is_retryable_status(response.status())
                    {
                        let delay = self.policy.backoff_delay(attempt);
                        tracing::warn!(
                            "CRM webhook returned {}, retrying in {:?}",
                            response.status(),
                            delay
                        );
                        self.sleeper.sleep(delay).await;
                        continue;
                    }

                    // Client error, or a server error on the last attempt:
                    // hand the response back for the caller to inspect.
                    return Ok(response);
                }
                Err(e) => {
                    if attempt == max_attempts {
                        return Err(AppError::ExternalApiError(format!(
                            "CRM webhook request failed: {}",
                            e
                        )));
                    }
                    let delay = self.policy.backoff_delay(attempt);
                    tracing::warn!("CRM webhook network error ({}), retrying in {:?}", e, delay);
                    self.sleeper.sleep(delay).await;
                }
            }
        }

        Err(AppError::InternalError(
            "CRM webhook retry loop exhausted without a result".to_string(),
        ))
    }
}
