use crate::errors::AppError;
use crate::models::LeadSubmission;
use chrono::Utc;
use serde_json::json;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.resend.com";

const SECTION_RULE: &str = "===========================================";

/// Secondary notification channel, used only when CRM delivery fails or the
/// webhook is not configured.
///
/// Best effort by contract: delivery errors are reported to the caller, who
/// swallows and logs them. When no email API key is configured the full
/// report is written to the logs so the lead is still recoverable by an
/// operator.
pub struct FallbackNotifier {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    to_address: String,
    from_address: String,
}

impl FallbackNotifier {
    pub fn new(
        api_key: Option<String>,
        to_address: String,
        from_address: String,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create email client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            to_address,
            from_address,
        })
    }

    /// Overrides the email API base URL. Used by tests to point at a mock server.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Composes the lead report and delivers it over the secondary channel.
    pub async fn notify(&self, lead: &LeadSubmission) -> Result<(), AppError> {
        let subject = format!(
            "URGENT: New Lead - {} (Webhook Failed)",
            lead.contact_name
        );
        let body = compose_report(lead);

        let Some(ref api_key) = self.api_key else {
            tracing::warn!("Email API key not configured; logging fallback lead report");
            tracing::warn!("Fallback lead report:\n{}", body);
            return Ok(());
        };

        let url = format!("{}/emails", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&json!({
                "from": self.from_address.as_str(),
                "to": [self.to_address.as_str()],
                "subject": subject,
                "text": body,
            }))
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Email API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Email API returned {}: {}",
                status, error_text
            )));
        }

        tracing::info!("Fallback email sent to {}", self.to_address);
        Ok(())
    }
}

/// Structured plain-text report an operator can act on without any tooling.
pub fn compose_report(lead: &LeadSubmission) -> String {
    let mut report = String::new();

    report.push_str("URGENT: CRM webhook failed - please follow up manually!\n");

    push_section(&mut report, "CONTACT INFORMATION");
    report.push_str(&format!("Name: {}\n", lead.contact_name));
    report.push_str(&format!("Phone: {}\n", lead.contact_phone));
    report.push_str(&format!("Email: {}\n", lead.contact_email));

    push_section(&mut report, "PROPERTY DETAILS");
    report.push_str(&format!("Property Type: {}\n", lead.property_type));
    report.push_str(&format!("City: {}\n", lead.city));
    if let Some(ref address) = lead.address {
        report.push_str(&format!("Address: {}\n", address));
    }
    report.push_str(&format!("Date Needed: {}\n", lead.date_needed));
    if lead.access_difficult {
        report.push_str("Difficult Access\n");
    }

    push_section(&mut report, "JUNK DETAILS");
    report.push_str(&format!("Types: {}\n", lead.junk_types.join(", ")));

    push_section(&mut report, "AI ESTIMATE");
    match lead.estimate {
        Some(ref estimate) => {
            report.push_str(&format!(
                "Volume: {}-{} cubic yards\n",
                estimate.cubic_yards.min, estimate.cubic_yards.max
            ));
            report.push_str(&format!(
                "Price Range: ${} - ${}\n",
                estimate.price_range.min, estimate.price_range.max
            ));
            report.push_str(&format!(
                "Best Estimate: ${}\n",
                estimate.price_range.estimate
            ));
            report.push_str(&format!("Confidence: {}\n", estimate.confidence));
            if !estimate.notes.is_empty() {
                report.push_str(&format!("AI Notes: {}\n", estimate.notes));
            }
        }
        None => report.push_str("No estimate attached\n"),
    }

    push_section(&mut report, &format!("PHOTOS ({})", lead.photos.len()));
    for (index, photo) in lead.photos.iter().enumerate() {
        report.push_str(&format!("Photo {}: {}\n", index + 1, photo.url));
    }

    if let Some(ref notes) = lead.notes {
        push_section(&mut report, "ADDITIONAL NOTES");
        report.push_str(&format!("{}\n", notes));
    }

    push_section(&mut report, "METADATA");
    report.push_str(&format!("Submitted: {}\n", Utc::now().to_rfc3339()));
    report.push_str("Source: Website Quote Form\n");

    report.push_str(
        "\nACTION REQUIRED: CRM webhook failed, add this lead to the CRM manually!\n",
    );

    report
}

fn push_section(report: &mut String, title: &str) {
    report.push_str(&format!("\n{}\n{}\n{}\n", SECTION_RULE, title, SECTION_RULE));
}
