//! Bundle Routes

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{ApiError, SharedState};

/// Response for a successful reload
#[derive(Debug, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub bundle_id: String,
    pub previous_bundle_id: String,
    pub spec_version: String,
}

/// Re-read the bundle file and swap it in. A bundle that fails validation is
/// rejected and the serving bundle stays in place.
pub async fn reload(State(state): State<SharedState>) -> Result<Json<ReloadResponse>, ApiError> {
    let loaded = state.store.load().map_err(|err| {
        metrics::counter!("fraud_bundle_reloads_total", "result" => "unreadable").increment(1);
        warn!(error = %err, path = %state.store.path().display(), "Bundle reload failed");
        ApiError::from(err)
    })?;

    let validated = loaded.validate_registered().map_err(|err| {
        metrics::counter!("fraud_bundle_reloads_total", "result" => "rejected").increment(1);
        ApiError::from(err)
    })?;

    let spec_version = validated.spec_version().to_string();
    let bundle_id = validated.bundle_id().to_string();
    let previous = state.scorer.handle().swap(validated);
    metrics::counter!("fraud_bundle_reloads_total", "result" => "swapped").increment(1);
    info!(bundle_id = %bundle_id, "Bundle reloaded");

    Ok(Json(ReloadResponse {
        bundle_id,
        previous_bundle_id: previous.bundle_id().to_string(),
        spec_version,
    }))
}
