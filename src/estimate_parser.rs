//! Parser for the estimator's free-text response.
//!
//! The model is prompted to return a single JSON object but is treated as an
//! opaque collaborator: the response may wrap the object in prose, truncate
//! it, or skip fields. The fallback ladder is: greedy brace match -> strict
//! JSON parse -> per-field defaults -> conservative default. This function
//! never fails; callers always get a usable estimate.

use crate::models::{Confidence, EstimatedItem, VolumeEstimate};
use regex::Regex;
use serde_json::Value;

/// Defaults substituted for individual missing/unparseable fields when the
/// JSON block itself parsed.
const FIELD_DEFAULT_MIN: f64 = 10.0;
const FIELD_DEFAULT_MAX: f64 = 20.0;

/// Extracts a `VolumeEstimate` from the estimator's raw text.
pub fn parse_estimate_text(text: &str) -> VolumeEstimate {
    // Greedy match from the first '{' to the last '}', same as the
    // single-object contract the estimator is prompted with.
    let json_block_re = Regex::new(r"(?s)\{.*\}").unwrap();

    let Some(json_block) = json_block_re.find(text) else {
        tracing::warn!("No JSON object found in estimator response");
        return VolumeEstimate::conservative_default();
    };

    let parsed: Value = match serde_json::from_str(json_block.as_str()) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Failed to parse estimator JSON block: {}", e);
            return VolumeEstimate::conservative_default();
        }
    };

    let cubic_yards_min = parsed
        .get("cubic_yards_min")
        .and_then(Value::as_f64)
        .unwrap_or(FIELD_DEFAULT_MIN);
    let cubic_yards_max = parsed
        .get("cubic_yards_max")
        .and_then(Value::as_f64)
        .unwrap_or(FIELD_DEFAULT_MAX);
    let confidence = parsed
        .get("confidence")
        .and_then(Value::as_str)
        .and_then(Confidence::parse)
        .unwrap_or(Confidence::Medium);
    let items = parsed.get("items").map(parse_items).unwrap_or_default();
    let notes = parsed
        .get("notes")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    // A response violating the volume invariants is as useless as no
    // response; fall back rather than propagate a nonsense band.
    if cubic_yards_min < 0.0 || cubic_yards_max < cubic_yards_min {
        tracing::warn!(
            "Estimator returned invalid volume band {}-{}",
            cubic_yards_min,
            cubic_yards_max
        );
        return VolumeEstimate::conservative_default();
    }

    VolumeEstimate {
        cubic_yards_min,
        cubic_yards_max,
        confidence,
        items,
        notes,
    }
}

fn parse_items(value: &Value) -> Vec<EstimatedItem> {
    let Some(entries) = value.as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let item_type = entry.get("type")?.as_str()?.to_string();
            let quantity = entry
                .get("quantity")
                .and_then(Value::as_u64)
                .map(|q| q.max(1))
                .unwrap_or(1) as u32;
            let cubic_yards = entry
                .get("cubic_yards")
                .and_then(Value::as_f64)
                .filter(|v| *v >= 0.0)
                .unwrap_or(0.0);
            Some(EstimatedItem {
                item_type,
                quantity,
                cubic_yards,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_json_embedded_in_prose() {
        let text = r#"Based on the photos, here is my estimate:
            {"cubic_yards_min":5,"cubic_yards_max":8,"confidence":"high","items":[],"notes":"x"}
            Let me know if you need anything else."#;

        let estimate = parse_estimate_text(text);
        assert_eq!(estimate.cubic_yards_min, 5.0);
        assert_eq!(estimate.cubic_yards_max, 8.0);
        assert_eq!(estimate.confidence, Confidence::High);
        assert!(estimate.items.is_empty());
        assert_eq!(estimate.notes, "x");
    }

    #[test]
    fn unparseable_text_returns_conservative_default() {
        let estimate = parse_estimate_text("I cannot estimate this from the photos provided.");
        assert_eq!(estimate.cubic_yards_min, 10.0);
        assert_eq!(estimate.cubic_yards_max, 30.0);
        assert_eq!(estimate.confidence, Confidence::Low);
    }

    #[test]
    fn truncated_json_returns_conservative_default() {
        let estimate = parse_estimate_text(r#"{"cubic_yards_min": 5, "cubic_yards_max"#);
        assert_eq!(estimate.cubic_yards_min, 10.0);
        assert_eq!(estimate.cubic_yards_max, 30.0);
        assert_eq!(estimate.confidence, Confidence::Low);
    }

    #[test]
    fn missing_fields_get_per_field_defaults() {
        let estimate = parse_estimate_text(r#"{"notes": "mostly yard waste"}"#);
        assert_eq!(estimate.cubic_yards_min, 10.0);
        assert_eq!(estimate.cubic_yards_max, 20.0);
        assert_eq!(estimate.confidence, Confidence::Medium);
        assert_eq!(estimate.notes, "mostly yard waste");
    }

    #[test]
    fn unknown_confidence_defaults_to_medium() {
        let estimate =
            parse_estimate_text(r#"{"cubic_yards_min": 3, "cubic_yards_max": 6, "confidence": "certain"}"#);
        assert_eq!(estimate.confidence, Confidence::Medium);
    }

    #[test]
    fn negative_or_inverted_band_falls_back() {
        let estimate = parse_estimate_text(r#"{"cubic_yards_min": -2, "cubic_yards_max": 6}"#);
        assert_eq!(estimate.cubic_yards_min, 10.0);
        assert_eq!(estimate.confidence, Confidence::Low);

        let estimate = parse_estimate_text(r#"{"cubic_yards_min": 9, "cubic_yards_max": 4}"#);
        assert_eq!(estimate.cubic_yards_max, 30.0);
        assert_eq!(estimate.confidence, Confidence::Low);
    }

    #[test]
    fn greedy_match_over_multiple_objects_falls_back() {
        // Two separate objects greedy-match into one invalid block; the
        // ladder lands on the conservative default rather than guessing.
        let text = r#"{"cubic_yards_min": 2} and also {"unrelated": true}"#;
        let estimate = parse_estimate_text(text);
        assert_eq!(estimate.cubic_yards_min, 10.0);
        assert_eq!(estimate.cubic_yards_max, 30.0);
    }

    #[test]
    fn items_are_parsed_with_sane_bounds() {
        let text = r#"{
            "cubic_yards_min": 4,
            "cubic_yards_max": 7,
            "confidence": "medium",
            "items": [
                {"type": "sofa", "quantity": 1, "cubic_yards": 2.5},
                {"type": "boxes", "quantity": 0, "cubic_yards": -3},
                {"quantity": 2, "cubic_yards": 1.0},
                "not an object"
            ]
        }"#;

        let estimate = parse_estimate_text(text);
        // entries without a type are dropped, bad numbers clamped
        assert_eq!(estimate.items.len(), 2);
        assert_eq!(estimate.items[0].item_type, "sofa");
        assert_eq!(estimate.items[1].quantity, 1);
        assert_eq!(estimate.items[1].cubic_yards, 0.0);
    }
}
