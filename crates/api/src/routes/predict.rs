//! Prediction Routes

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use data_validator::TransactionRecord;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

use crate::{ApiError, SharedState};

/// Root banner
#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub message: String,
}

pub async fn home() -> Json<HomeResponse> {
    Json(HomeResponse {
        message: "Fraud Detection API is running".to_string(),
    })
}

/// Response for the predict endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub is_fraud: bool,
    pub fraud_probability: f64,
    pub spec_version: String,
    pub bundle_id: String,
}

/// Score one transaction and record it in the running aggregate
pub async fn predict(
    State(state): State<SharedState>,
    payload: Result<Json<TransactionRecord>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(record) = payload.map_err(|rejection| {
        metrics::counter!("fraud_prediction_errors_total", "kind" => "body").increment(1);
        ApiError::from(rejection)
    })?;
    let start = Instant::now();
    let outcome = match state.scorer.score_and_observe(&record, &state.aggregate) {
        Ok(outcome) => outcome,
        Err(err) => {
            let err = ApiError::from(err);
            let kind = match &err {
                ApiError::Validation(_) => "validation",
                _ => "internal",
            };
            metrics::counter!("fraud_prediction_errors_total", "kind" => kind).increment(1);
            return Err(err);
        }
    };

    metrics::histogram!("fraud_scoring_duration_seconds").record(start.elapsed().as_secs_f64());
    let label = if outcome.is_fraud { "fraud" } else { "legit" };
    metrics::counter!("fraud_predictions_total", "outcome" => label).increment(1);
    if outcome.is_fraud {
        info!(
            bundle_id = %outcome.bundle_id,
            fraud_probability = outcome.fraud_probability,
            "Transaction flagged"
        );
    }

    Ok(Json(PredictResponse {
        is_fraud: outcome.is_fraud,
        fraud_probability: outcome.fraud_probability,
        spec_version: outcome.spec_version.to_string(),
        bundle_id: outcome.bundle_id.to_string(),
    }))
}
