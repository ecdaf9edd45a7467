use crate::circuit_breaker::EstimatorCircuitBreaker;
use crate::config::Config;
use crate::delivery::{DeliveryOutcome, LeadPipeline};
use crate::errors::{AppError, ResultExt};
use crate::estimate_cache::{estimate_cache_key, ValidatedCacheEntry};
use crate::estimator::EstimatorClient;
use crate::models::{
    EstimateRequest, EstimateResult, LeadResponse, LeadSubmission, VolumeBand,
};
use crate::pricing::{PricingBreakdown, PricingEngine, SurchargeOptions};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use moka::future::Cache;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state injected into handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Pricing calculator with the injected table.
    pub pricing: PricingEngine,
    /// Client for the vision estimator (absent when no API key is configured).
    pub estimator: Option<EstimatorClient>,
    /// Circuit breaker guarding estimator calls.
    pub estimator_breaker: EstimatorCircuitBreaker,
    /// Lead delivery pipeline (spam filter, webhook retry, fallback).
    pub pipeline: LeadPipeline,
    /// Estimate response cache (1h TTL) to avoid duplicate model calls.
    /// Key: content hash, Value: checksummed JSON string.
    pub estimate_cache: Cache<String, String>,
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "junk-quote-api",
            "version": "0.1.0"
        })),
    )
}

/// POST /api/v1/estimate
///
/// Turns uploaded photos plus form context into a volume estimate and a
/// customer-facing price band. Parse failures inside the estimator response
/// degrade to conservative defaults; only transport-level failures surface
/// as errors.
pub async fn estimate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EstimateRequest>,
) -> Result<Json<EstimateResult>, AppError> {
    if request.photos.is_empty() {
        return Err(AppError::BadRequest("No photos provided".to_string()));
    }

    let Some(ref estimator) = state.estimator else {
        tracing::error!("Estimate requested but no estimator API key is configured");
        return Err(AppError::InternalError(
            "Estimation service not configured".to_string(),
        ));
    };

    let cache_key =
        estimate_cache_key(&request.photos, &request.junk_types, &request.property_type);

    if let Some(cached) = state.estimate_cache.get(&cache_key).await {
        match ValidatedCacheEntry::deserialize_and_validate(&cached)
            .and_then(|data| serde_json::from_str::<EstimateResult>(&data).ok())
        {
            Some(result) => {
                tracing::debug!("Estimate cache hit");
                return Ok(Json(result));
            }
            None => {
                // Corrupted entry: drop it and fetch fresh.
                state.estimate_cache.invalidate(&cache_key).await;
            }
        }
    }

    use failsafe::futures::CircuitBreaker as _;
    let volume = match state
        .estimator_breaker
        .call(estimator.estimate(&request.photos, &request.junk_types, &request.property_type))
        .await
    {
        Ok(estimate) => estimate,
        Err(failsafe::Error::Inner(e)) => return Err(e),
        Err(failsafe::Error::Rejected) => {
            tracing::warn!("Estimator circuit open; failing fast");
            return Err(AppError::ExternalApiError(
                "Estimation service temporarily unavailable".to_string(),
            ));
        }
    };

    // Surcharge options are collected later in the form flow, so the initial
    // quote prices the bare volume band.
    let price_range = state.pricing.price_range(
        volume.cubic_yards_min,
        volume.cubic_yards_max,
        &SurchargeOptions::default(),
    );

    let result = EstimateResult {
        cubic_yards: VolumeBand {
            min: volume.cubic_yards_min,
            max: volume.cubic_yards_max,
        },
        price_range,
        confidence: volume.confidence,
        items: volume.items,
        notes: volume.notes,
    };

    if let Ok(serialized) = serde_json::to_string(&result) {
        let entry = ValidatedCacheEntry::new(serialized);
        state.estimate_cache.insert(cache_key, entry.serialize()).await;
    }

    Ok(Json(result))
}

/// Query parameters for the pricing breakdown endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownQuery {
    pub cubic_yards: f64,
    #[serde(default)]
    pub stairs: bool,
    #[serde(default)]
    pub difficult_access: bool,
    #[serde(default)]
    pub heavy_items: bool,
}

/// GET /api/v1/pricing/breakdown
///
/// Itemized price decomposition for display. The engine itself has no input
/// guard, so the volume is validated here.
pub async fn pricing_breakdown(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BreakdownQuery>,
) -> Result<Json<PricingBreakdown>, AppError> {
    if !query.cubic_yards.is_finite() || query.cubic_yards < 0.0 {
        return Err(AppError::BadRequest(
            "cubic_yards must be a non-negative number".to_string(),
        ));
    }

    let options = SurchargeOptions {
        stairs: query.stairs,
        difficult_access: query.difficult_access,
        heavy_items: query.heavy_items,
    };

    Ok(Json(state.pricing.breakdown(query.cubic_yards, &options)))
}

/// POST /api/v1/leads
///
/// Runs the delivery pipeline. Spam and every post-validation delivery
/// outcome yield the identical success body; only structural validation
/// failures and unexpected errors produce error responses.
pub async fn submit_lead(
    State(state): State<Arc<AppState>>,
    Json(lead): Json<LeadSubmission>,
) -> Result<(StatusCode, Json<LeadResponse>), AppError> {
    let lead_id = Uuid::new_v4();
    tracing::info!(%lead_id, "Received lead submission");

    let outcome = state
        .pipeline
        .process(&lead)
        .await
        .context("processing lead submission")?;

    match outcome {
        DeliveryOutcome::SpamRejected => {
            tracing::warn!(%lead_id, "Lead short-circuited by spam filter")
        }
        DeliveryOutcome::Delivered => tracing::info!(%lead_id, "Lead delivered to CRM"),
        DeliveryOutcome::FallbackDelivered => {
            tracing::warn!(%lead_id, "Lead delivered via fallback notifier")
        }
        DeliveryOutcome::FallbackFailed => {
            tracing::error!(%lead_id, "Lead delivery and fallback both failed; see logs")
        }
    }

    Ok((
        StatusCode::OK,
        Json(LeadResponse {
            success: true,
            message: "Lead received".to_string(),
        }),
    ))
}
