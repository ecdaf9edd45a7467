use crate::pricing::PriceRange;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============ Estimation Models ============

/// Estimator self-reported confidence in a volume estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Parses the estimator's free-text confidence value, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Confidence::High),
            "medium" => Some(Confidence::Medium),
            "low" => Some(Confidence::Low),
            _ => None,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        };
        write!(f, "{}", label)
    }
}

/// One item the estimator identified in the photos.
///
/// Field names match the JSON contract the estimator is prompted to return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatedItem {
    #[serde(rename = "type")]
    pub item_type: String,
    pub quantity: u32,
    pub cubic_yards: f64,
}

/// Volume estimate produced by parsing the estimator's free-text response.
///
/// Immutable once constructed; always satisfies
/// `cubic_yards_max >= cubic_yards_min >= 0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeEstimate {
    pub cubic_yards_min: f64,
    pub cubic_yards_max: f64,
    pub confidence: Confidence,
    pub items: Vec<EstimatedItem>,
    pub notes: String,
}

impl VolumeEstimate {
    /// Conservative default used when the estimator response cannot be parsed
    /// at all. Wide band, low confidence.
    pub fn conservative_default() -> Self {
        Self {
            cubic_yards_min: 10.0,
            cubic_yards_max: 30.0,
            confidence: Confidence::Low,
            items: Vec::new(),
            notes: "Could not parse estimator response. Using conservative estimate.".to_string(),
        }
    }
}

// ============ API Request/Response Models ============

/// Uploaded photo reference from the photo-upload widget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub url: String,
    pub public_id: String,
}

/// Request payload for the estimate endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateRequest {
    #[serde(default)]
    pub photos: Vec<Photo>,
    #[serde(default)]
    pub junk_types: Vec<String>,
    pub property_type: String,
}

/// Volume band in cubic yards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VolumeBand {
    pub min: f64,
    pub max: f64,
}

/// Estimate returned to the client, and later attached to the lead
/// submission unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateResult {
    pub cubic_yards: VolumeBand,
    pub price_range: PriceRange,
    pub confidence: Confidence,
    #[serde(default)]
    pub items: Vec<EstimatedItem>,
    #[serde(default)]
    pub notes: String,
}

/// Submitted quote-form payload. Created at submission time, never mutated,
/// not persisted here (CRM storage is the external collaborator's job).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSubmission {
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub property_type: String,
    #[serde(default)]
    pub junk_types: Vec<String>,
    pub city: String,
    #[serde(default)]
    pub address: Option<String>,
    /// Either a `yyyy-mm-dd` date or the literal `"ASAP"`.
    pub date_needed: String,
    #[serde(default)]
    pub asap: bool,
    #[serde(default)]
    pub access_difficult: bool,
    #[serde(default)]
    pub photos: Vec<Photo>,
    /// Honeypot. Hidden on the form; humans never fill it.
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub estimate: Option<EstimateResult>,
}

impl LeadSubmission {
    /// Non-empty honeypot means an automated submitter filled the hidden field.
    pub fn is_spam(&self) -> bool {
        self.website.as_deref().is_some_and(|w| !w.is_empty())
    }
}

/// Response payload for lead submission. Identical shape for spam and
/// genuine submissions so automated submitters learn nothing.
#[derive(Debug, Serialize)]
pub struct LeadResponse {
    pub success: bool,
    pub message: String,
}

// ============ CRM Webhook Payload ============

/// Flattened lead payload POSTed to the CRM webhook.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmLeadPayload {
    // Contact information
    pub name: String,
    pub email: String,
    pub phone: String,

    // Property details
    pub property_type: String,
    /// Comma-joined junk type labels.
    pub junk_types: String,
    pub city: String,
    pub address: String,
    pub date_needed: String,
    pub access_difficult: bool,
    pub notes: String,

    // AI estimate (omitted when no estimate was attached)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cubic_yards_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cubic_yards_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_max: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_estimate: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_notes: Option<String>,

    // Photos
    pub photo_count: usize,
    /// Newline-joined photo URLs.
    pub photo_urls: String,

    // Metadata
    pub submitted_at: DateTime<Utc>,
    pub source: String,
}

impl CrmLeadPayload {
    pub fn from_submission(lead: &LeadSubmission) -> Self {
        let estimate = lead.estimate.as_ref();

        Self {
            name: lead.contact_name.clone(),
            email: lead.contact_email.clone(),
            phone: lead.contact_phone.clone(),
            property_type: lead.property_type.clone(),
            junk_types: lead.junk_types.join(", "),
            city: lead.city.clone(),
            address: lead.address.clone().unwrap_or_default(),
            date_needed: lead.date_needed.clone(),
            access_difficult: lead.access_difficult,
            notes: lead.notes.clone().unwrap_or_default(),
            cubic_yards_min: estimate.map(|e| e.cubic_yards.min),
            cubic_yards_max: estimate.map(|e| e.cubic_yards.max),
            price_min: estimate.map(|e| e.price_range.min),
            price_max: estimate.map(|e| e.price_range.max),
            price_estimate: estimate.map(|e| e.price_range.estimate),
            confidence: estimate.map(|e| e.confidence),
            ai_notes: estimate.map(|e| e.notes.clone()),
            photo_count: lead.photos.len(),
            photo_urls: lead
                .photos
                .iter()
                .map(|p| p.url.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            submitted_at: Utc::now(),
            source: "Website Quote Form".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_submission_json() -> &'static str {
        r#"
        {
            "contactName": "Sarah Miller",
            "contactEmail": "sarah@example.com",
            "contactPhone": "(208) 555-0134",
            "propertyType": "residential",
            "junkTypes": ["furniture", "appliances"],
            "city": "Boise",
            "dateNeeded": "ASAP",
            "asap": true,
            "photos": [
                {"url": "https://cdn.example.com/a.jpg", "publicId": "leads/a"}
            ],
            "website": "",
            "estimate": {
                "cubicYards": {"min": 10.0, "max": 30.0},
                "priceRange": {"min": 304, "max": 1248, "estimate": 710},
                "confidence": "medium",
                "notes": "stacked boxes may hide volume"
            }
        }
        "#
    }

    #[test]
    fn parses_camel_case_submission() {
        let lead: LeadSubmission = serde_json::from_str(sample_submission_json()).unwrap();
        assert_eq!(lead.contact_name, "Sarah Miller");
        assert_eq!(lead.junk_types.len(), 2);
        assert_eq!(lead.date_needed, "ASAP");
        assert!(lead.asap);
        assert_eq!(lead.photos[0].public_id, "leads/a");
        assert!(!lead.is_spam());

        let estimate = lead.estimate.unwrap();
        assert_eq!(estimate.price_range.estimate, 710);
        assert_eq!(estimate.confidence, Confidence::Medium);
        // items omitted on the wire defaults to empty
        assert!(estimate.items.is_empty());
    }

    #[test]
    fn honeypot_value_marks_spam() {
        let mut lead: LeadSubmission = serde_json::from_str(sample_submission_json()).unwrap();
        assert!(!lead.is_spam());
        lead.website = Some("https://spam.example".to_string());
        assert!(lead.is_spam());
    }

    #[test]
    fn crm_payload_flattens_estimate_and_photos() {
        let lead: LeadSubmission = serde_json::from_str(sample_submission_json()).unwrap();
        let payload = CrmLeadPayload::from_submission(&lead);

        assert_eq!(payload.junk_types, "furniture, appliances");
        assert_eq!(payload.photo_count, 1);
        assert_eq!(payload.photo_urls, "https://cdn.example.com/a.jpg");
        assert_eq!(payload.price_estimate, Some(710));
        assert_eq!(payload.source, "Website Quote Form");

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["propertyType"], "residential");
        assert_eq!(json["confidence"], "medium");
    }

    #[test]
    fn crm_payload_omits_estimate_fields_when_absent() {
        let mut lead: LeadSubmission = serde_json::from_str(sample_submission_json()).unwrap();
        lead.estimate = None;
        let payload = CrmLeadPayload::from_submission(&lead);

        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("priceMin").is_none());
        assert!(json.get("cubicYardsMin").is_none());
        assert_eq!(json["photoCount"], 1);
    }

    #[test]
    fn confidence_parses_case_insensitively() {
        assert_eq!(Confidence::parse("High"), Some(Confidence::High));
        assert_eq!(Confidence::parse(" medium "), Some(Confidence::Medium));
        assert_eq!(Confidence::parse("LOW"), Some(Confidence::Low));
        assert_eq!(Confidence::parse("certain"), None);
    }
}
