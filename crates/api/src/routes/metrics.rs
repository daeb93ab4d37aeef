//! Prometheus Metrics Route

use axum::extract::State;

use crate::{ApiError, SharedState};

/// Render the Prometheus text exposition
pub async fn render(State(state): State<SharedState>) -> Result<String, ApiError> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or(ApiError::MetricsDisabled)
}
