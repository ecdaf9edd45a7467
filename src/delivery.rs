//! Lead delivery pipeline.
//!
//! Received -> SpamRejected (terminal, success shape)
//! Received -> Validated -> WebhookAttempt(n) -> Delivered
//!                                            -> WebhookExhausted -> FallbackAttempt
//!                                               -> FallbackDelivered | FallbackFailed (logged only)
//!
//! Once a submission passes the spam check and validation, the caller always
//! observes success: notification-infrastructure failures must never block
//! the user.

use crate::crm::CrmClient;
use crate::errors::AppError;
use crate::models::{CrmLeadPayload, LeadSubmission};
use crate::notifier::FallbackNotifier;
use crate::validation::{is_valid_email, validate_us_phone};

/// Terminal state of a processed submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Honeypot tripped; nothing was sent anywhere.
    SpamRejected,
    /// CRM webhook accepted the lead.
    Delivered,
    /// CRM delivery failed or was not configured; the fallback notifier got it.
    FallbackDelivered,
    /// Both channels failed. The lead survives only in the logs.
    FallbackFailed,
}

pub struct LeadPipeline {
    crm: Option<CrmClient>,
    notifier: FallbackNotifier,
}

impl LeadPipeline {
    /// `crm` is `None` when no webhook URL is configured. That state is
    /// observable (warned at startup and per lead) and routes submissions
    /// straight to the fallback notifier so no lead is silently dropped.
    pub fn new(crm: Option<CrmClient>, notifier: FallbackNotifier) -> Self {
        Self { crm, notifier }
    }

    /// Runs a submission through spam check, validation and delivery.
    ///
    /// Returns `Err` only for validation failures; every post-validation
    /// outcome is an `Ok` so the HTTP layer reports success.
    pub async fn process(&self, lead: &LeadSubmission) -> Result<DeliveryOutcome, AppError> {
        if lead.is_spam() {
            // Return the success shape without delivering anything, so
            // automated submitters cannot tell they were detected.
            tracing::warn!(
                "Spam submission detected (honeypot triggered): email={}",
                lead.contact_email
            );
            return Ok(DeliveryOutcome::SpamRejected);
        }

        validate_submission(lead)?;

        tracing::info!(
            "Valid lead received: name={}, city={}, property={}, photos={}",
            lead.contact_name,
            lead.city,
            lead.property_type,
            lead.photos.len()
        );

        let Some(ref crm) = self.crm else {
            tracing::warn!("CRM webhook URL not configured - routing lead to fallback notifier");
            return Ok(self.run_fallback(lead).await);
        };

        let payload = CrmLeadPayload::from_submission(lead);
        match crm.send_with_retry(&payload).await {
            Ok(response) if response.status().is_success() => {
                tracing::info!("Lead sent to CRM successfully");
                Ok(DeliveryOutcome::Delivered)
            }
            Ok(response) => {
                tracing::error!(
                    "CRM webhook failed with status {} after retries",
                    response.status()
                );
                Ok(self.run_fallback(lead).await)
            }
            Err(e) => {
                tracing::error!("CRM webhook failed: {}", e);
                Ok(self.run_fallback(lead).await)
            }
        }
    }

    async fn run_fallback(&self, lead: &LeadSubmission) -> DeliveryOutcome {
        match self.notifier.notify(lead).await {
            Ok(()) => {
                tracing::info!("Fallback notification sent");
                DeliveryOutcome::FallbackDelivered
            }
            Err(e) => {
                // Swallowed by contract: the submission still succeeds.
                tracing::error!("Fallback notification also failed: {}", e);
                DeliveryOutcome::FallbackFailed
            }
        }
    }
}

/// Basic structural validation. Failures are client errors and are never
/// retried.
pub fn validate_submission(lead: &LeadSubmission) -> Result<(), AppError> {
    if lead.photos.is_empty() {
        return Err(AppError::BadRequest("No photos provided".to_string()));
    }
    if lead.contact_name.trim().is_empty() {
        return Err(AppError::BadRequest("Contact name is required".to_string()));
    }
    if !is_valid_email(&lead.contact_email) {
        return Err(AppError::BadRequest(
            "A valid contact email is required".to_string(),
        ));
    }
    let (phone_valid, _) = validate_us_phone(&lead.contact_phone);
    if !phone_valid {
        return Err(AppError::BadRequest(
            "A valid contact phone number is required".to_string(),
        ));
    }
    Ok(())
}
