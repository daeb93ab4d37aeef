//! HTTP Error Mapping

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use data_validator::ValidationError;
use inference_engine::{BundleMismatchError, ScoringError};
use serde::Serialize;
use storage::StorageError;
use thiserror::Error;
use tracing::error;

/// Errors surfaced by handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(ValidationError),
    #[error(transparent)]
    Scoring(ScoringError),
    #[error(transparent)]
    Bundle(#[from] BundleMismatchError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Metrics exporter is disabled")]
    MetricsDisabled,
    #[error("malformed request body: {message}")]
    Body { status: StatusCode, message: String },
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Body {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<ScoringError> for ApiError {
    fn from(err: ScoringError) -> Self {
        match err.validation() {
            Some(validation) => ApiError::Validation(validation.clone()),
            None => ApiError::Scoring(err),
        }
    }
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<&'static str>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Bundle(_) => StatusCode::CONFLICT,
            ApiError::MetricsDisabled => StatusCode::NOT_FOUND,
            ApiError::Body { status, .. } => *status,
            ApiError::Scoring(_) | ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        let fields = match &self {
            ApiError::Validation(err) => err.fields(),
            _ => Vec::new(),
        };
        let body = ErrorBody {
            error: self.to_string(),
            fields,
        };
        (status, Json(body)).into_response()
    }
}
