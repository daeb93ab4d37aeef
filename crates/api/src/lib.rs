//! Fraud Scoring API Server
//!
//! HTTP front end for the online scorer: single-transaction prediction, health,
//! atomic bundle reload and Prometheus metrics.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use feature_engine::RunningAggregate;
use inference_engine::Scorer;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use storage::BundleStore;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub mod config;
mod error;
mod routes;

pub use config::{LogFormat, LoggingConfig, ServiceConfig};
pub use error::{ApiError, ErrorBody};
pub use routes::bundle::ReloadResponse;
pub use routes::predict::{HomeResponse, PredictResponse};

/// Application state shared across handlers
pub struct AppState {
    /// Scorer bound to the live bundle
    pub scorer: Scorer,
    /// Per-identifier counts and last-seen times for served transactions
    pub aggregate: RunningAggregate,
    /// Where reloads read the bundle from
    pub store: BundleStore,
    /// Prometheus render handle, if the exporter is installed
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(scorer: Scorer, aggregate: RunningAggregate, store: BundleStore) -> Self {
        Self {
            scorer,
            aggregate,
            store,
            metrics: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

pub type SharedState = Arc<AppState>;

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub spec_version: String,
    pub bundle_id: String,
    pub trained_at: String,
    pub senders_tracked: usize,
}

/// Create the application router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(routes::predict::home))
        .route("/predict", post(routes::predict::predict))
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/bundle/reload", post(routes::bundle::reload))
        .route("/metrics", get(routes::metrics::render))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let bundle = state.scorer.handle().current();

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        spec_version: bundle.spec_version().to_string(),
        bundle_id: bundle.bundle_id().to_string(),
        trained_at: bundle.trained_at().to_rfc3339(),
        senders_tracked: state.aggregate.sender_count(),
    })
}

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match config.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// Load and validate the bundle, seed the aggregate, and build the shared state
pub fn build_state(config: &ServiceConfig) -> anyhow::Result<AppState> {
    use anyhow::Context;

    let store = BundleStore::new(&config.bundle_path);
    let bundle = store
        .load()
        .with_context(|| format!("Failed to load bundle from {}", config.bundle_path.display()))?
        .validate_registered()
        .context("Bundle does not match the feature specification")?;

    let aggregate = if config.history_paths.is_empty() {
        RunningAggregate::new()
    } else {
        let history = storage::read_labeled_csvs(&config.history_paths)
            .context("Failed to read aggregate history")?;
        let builder = bundle.builder();
        let transactions: Vec<_> = history
            .iter()
            .filter_map(|labeled| builder.validate(&labeled.record).ok())
            .collect();
        let skipped = history.len() - transactions.len();
        if skipped > 0 {
            warn!(skipped, "Invalid history rows left out of the running aggregate");
        }
        RunningAggregate::from_history(&transactions)
    };

    info!(
        bundle_id = %bundle.bundle_id(),
        spec = %bundle.spec_version(),
        "Serving bundle loaded"
    );
    Ok(AppState::new(Scorer::from_bundle(bundle), aggregate, store))
}

/// Run the server
pub async fn run_server(config: ServiceConfig) -> anyhow::Result<()> {
    use anyhow::Context;

    let mut state = build_state(&config)?;
    if config.metrics_enabled {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        state = state.with_metrics(handle);
    }
    let app = create_router(Arc::new(state));

    info!("Starting API server on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
