use serde::Deserialize;
use url::Url;

/// Default model used for photo volume estimation.
const DEFAULT_ESTIMATOR_MODEL: &str = "claude-sonnet-4-5-20250929";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    /// CRM webhook endpoint. Leads are routed to the fallback notifier when absent.
    pub crm_webhook_url: Option<String>,
    /// API key for the vision estimator. The estimate endpoint is disabled when absent.
    pub estimator_api_key: Option<String>,
    pub estimator_model: String,
    /// API key for the transactional email service used by the fallback notifier.
    /// When absent the notifier logs the full lead report instead of emailing it.
    pub email_api_key: Option<String>,
    pub lead_notify_to: String,
    pub lead_notify_from: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            crm_webhook_url: std::env::var("CRM_WEBHOOK_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|url| {
                    Url::parse(&url)
                        .map_err(|_| anyhow::anyhow!("CRM_WEBHOOK_URL must be a valid URL"))?;
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        anyhow::bail!("CRM_WEBHOOK_URL must start with http:// or https://");
                    }
                    Ok(url)
                })
                .transpose()?,
            estimator_api_key: std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            estimator_model: std::env::var("ESTIMATOR_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ESTIMATOR_MODEL.to_string()),
            email_api_key: std::env::var("RESEND_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            lead_notify_to: std::env::var("LEAD_NOTIFY_TO")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "team@junkhaulerboise.com".to_string()),
            lead_notify_from: std::env::var("LEAD_NOTIFY_FROM")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "Junk Hauler Boise <leads@junkhaulerboise.com>".to_string()),
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Server Port: {}", config.port);
        match config.crm_webhook_url {
            Some(ref url) => tracing::debug!("CRM webhook URL: {}", url),
            None => tracing::warn!(
                "CRM_WEBHOOK_URL not configured - leads will be routed to the fallback notifier"
            ),
        }
        if config.estimator_api_key.is_none() {
            tracing::warn!("ANTHROPIC_API_KEY not configured - photo estimation is disabled");
        }
        if config.email_api_key.is_none() {
            tracing::warn!(
                "RESEND_API_KEY not configured - fallback lead reports will only be logged"
            );
        }
        tracing::debug!("Estimator model: {}", config.estimator_model);
        tracing::debug!("Fallback notifications to: {}", config.lead_notify_to);

        Ok(config)
    }
}
