use crate::errors::AppError;
use crate::estimate_parser::parse_estimate_text;
use crate::models::{Photo, VolumeEstimate};
use serde_json::json;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Client for the vision-capable estimator model.
///
/// The model is an opaque collaborator: we send photos plus form context and
/// get back free-form text that `estimate_parser` turns into a
/// `VolumeEstimate`. Transport failures surface as errors; parse failures
/// never do.
#[derive(Clone)]
pub struct EstimatorClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl EstimatorClient {
    pub fn new(api_key: String, model: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create estimator client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            model,
        })
    }

    /// Overrides the API base URL. Used by tests to point at a mock server.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Requests a volume estimate for the given photos and form context.
    pub async fn estimate(
        &self,
        photos: &[Photo],
        junk_types: &[String],
        property_type: &str,
    ) -> Result<VolumeEstimate, AppError> {
        let url = format!("{}/v1/messages", self.base_url);
        let prompt = build_estimation_prompt(junk_types, property_type, photos.len());

        let mut content = vec![json!({"type": "text", "text": prompt})];
        for photo in photos {
            content.push(json!({
                "type": "image",
                "source": {"type": "url", "url": photo.url.as_str()}
            }));
        }

        let body = json!({
            "model": self.model.as_str(),
            "max_tokens": 1024,
            "messages": [{"role": "user", "content": content}],
        });

        tracing::info!("Requesting volume estimate for {} photo(s)", photos.len());

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Estimator request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Estimator returned {}: {}",
                status, error_text
            )));
        }

        let data: serde_json::Value = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse estimator response: {}", e))
        })?;

        let text = data
            .get("content")
            .and_then(|c| c.get(0))
            .and_then(|block| block.get("text"))
            .and_then(|t| t.as_str())
            .unwrap_or_default();

        if text.is_empty() {
            tracing::warn!("Estimator response contained no text content");
        }

        Ok(parse_estimate_text(text))
    }
}

/// Prompt with calibration examples so the model anchors its volumes to
/// real-world junk-removal reference points.
fn build_estimation_prompt(junk_types: &[String], property_type: &str, photo_count: usize) -> String {
    format!(
        r#"You are an expert junk removal volume estimator. Analyze the {photo_count} image(s) provided and estimate the total cubic yards of junk/debris.

**Context:**
- Property Type: {property_type}
- Reported Junk Types: {junk_types}

**Reference Examples (for calibration):**
- A standard 3-seater sofa = ~2-3 cubic yards
- A king mattress + box spring = ~3-4 cubic yards
- A refrigerator = ~4-5 cubic yards
- A standard pickup truck bed (8ft, loosely packed) = ~2-3 cubic yards
- A single room cleanout (10x10 room, half full) = ~10-15 cubic yards
- A full one-car garage = ~30-50 cubic yards
- A full dump truck load = ~10-14 cubic yards

**Instructions:**
1. Carefully examine all images provided
2. Identify visible items and estimate their individual volumes
3. Account for items that may be hidden or stacked
4. Consider packing density (items are typically loosely arranged)
5. Provide conservative estimates (it's better to underestimate slightly)

**Return ONLY a valid JSON object in this exact format:**
{{
  "cubic_yards_min": <number>,
  "cubic_yards_max": <number>,
  "confidence": "<high|medium|low>",
  "items": [
    {{"type": "<item description>", "quantity": <number>, "cubic_yards": <number>}}
  ],
  "notes": "<any important observations or caveats>"
}}

**Important:**
- Be conservative with estimates
- If items are partially visible or stacked, account for hidden volume
- Consider the surrounding space for scale
- Note if multiple angles show the same items to avoid double-counting
- If confidence is low, explain why in notes"#,
        photo_count = photo_count,
        property_type = property_type,
        junk_types = junk_types.join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let client = EstimatorClient::new("test-key".to_string(), "test-model".to_string());
        assert!(client.is_ok());
    }

    #[test]
    fn prompt_includes_form_context() {
        let junk_types = vec!["furniture".to_string(), "appliances".to_string()];
        let prompt = build_estimation_prompt(&junk_types, "residential", 3);

        assert!(prompt.contains("3 image(s)"));
        assert!(prompt.contains("Property Type: residential"));
        assert!(prompt.contains("furniture, appliances"));
        assert!(prompt.contains("\"cubic_yards_min\""));
    }
}
