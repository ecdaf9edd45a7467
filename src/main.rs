use axum::{
    routing::{get, post},
    Router,
};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use junk_quote_api::circuit_breaker::create_estimator_circuit_breaker;
use junk_quote_api::config::Config;
use junk_quote_api::crm::CrmClient;
use junk_quote_api::delivery::LeadPipeline;
use junk_quote_api::estimator::EstimatorClient;
use junk_quote_api::handlers::{self, AppState};
use junk_quote_api::notifier::FallbackNotifier;
use junk_quote_api::pricing::{PricingConfig, PricingEngine};

/// Main entry point for the application.
///
/// Initializes logging, configuration, the pricing engine, external clients
/// and HTTP routes with middleware (CORS, rate limiting, body limits), then
/// starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "junk_quote_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Pricing engine with the production table
    let pricing = PricingEngine::new(PricingConfig::standard());
    tracing::info!("Pricing engine initialized");

    // Estimate response cache (1 hour TTL, 10k max entries)
    let estimate_cache = Cache::builder()
        .time_to_live(Duration::from_secs(3600))
        .max_capacity(10_000)
        .build();
    tracing::info!("Estimate cache initialized (1h TTL, 10k capacity)");

    // Vision estimator client (optional; the estimate endpoint is disabled
    // without an API key)
    let estimator = match config.estimator_api_key.clone() {
        Some(api_key) => match EstimatorClient::new(api_key, config.estimator_model.clone()) {
            Ok(client) => {
                tracing::info!("Estimator client initialized: {}", config.estimator_model);
                Some(client)
            }
            Err(e) => {
                tracing::error!("Failed to initialize estimator client: {}", e);
                None
            }
        },
        None => None,
    };

    // CRM webhook client (optional; leads go to the fallback notifier
    // without a webhook URL)
    let crm = match config.crm_webhook_url.clone() {
        Some(webhook_url) => match CrmClient::new(webhook_url) {
            Ok(client) => {
                tracing::info!("CRM webhook client initialized");
                Some(client)
            }
            Err(e) => {
                tracing::error!("Failed to initialize CRM client: {}", e);
                None
            }
        },
        None => None,
    };

    let notifier = FallbackNotifier::new(
        config.email_api_key.clone(),
        config.lead_notify_to.clone(),
        config.lead_notify_from.clone(),
    )
    .map_err(|e| anyhow::anyhow!("Failed to initialize fallback notifier: {}", e))?;

    let pipeline = LeadPipeline::new(crm, notifier);

    // Build application state
    let app_state = Arc::new(AppState {
        config: config.clone(),
        pricing,
        estimator,
        estimator_breaker: create_estimator_circuit_breaker(),
        pipeline,
        estimate_cache,
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    // Build protected routes with security layers
    let protected_routes = Router::new()
        .route("/api/v1/estimate", post(handlers::estimate))
        .route("/api/v1/leads", post(handlers::submit_lead))
        .route(
            "/api/v1/pricing/breakdown",
            get(handlers::pricing_breakdown),
        )
        .layer(
            ServiceBuilder::new()
                // Request size limit: 5MB max payload (prevents memory exhaustion)
                .layer(RequestBodyLimitLayer::new(5 * 1024 * 1024))
                // Rate limiting: 10 req/sec per IP, burst of 20
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Build final app with health check (bypasses rate limiting)
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
