use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use super::json_response;
use crate::core::{
    ProjectionError, ValidationError, ValidationReport, ValidationWarning, YearProjection,
};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid parameter: {field} - {message}")]
    InvalidParameter { field: String, message: String },

    #[error("Validation failed: {0}")]
    Validation(ValidationReport),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        ApiError::InvalidParameter {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Serialization(err.to_string())
    }
}

impl From<ProjectionError> for ApiError {
    fn from(err: ProjectionError) -> Self {
        match err {
            ProjectionError::Invalid(report) => ApiError::Validation(report),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        error!(error = %err, "projection task failed");
        ApiError::Internal
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidationFailure<'a> {
    errors: &'a [ValidationError],
    warnings: &'a [ValidationWarning],
    projections: &'a [YearProjection],
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::InvalidParameter { .. } | ApiError::Serialization(_) => json_response(
                StatusCode::BAD_REQUEST,
                json!({ "error": self.to_string() }),
            ),
            ApiError::Validation(report) => json_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                ValidationFailure {
                    errors: &report.errors,
                    warnings: &report.warnings,
                    projections: &[],
                },
            ),
            ApiError::Internal => {
                error!("internal error surfaced to client");
                json_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
