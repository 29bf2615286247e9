use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::analysis::AnalysisError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True for failures caused by the caller's input rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_) | AppError::Analysis(AnalysisError::NoFileProvided)
        )
    }

    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Analysis(err) => analysis_parts(err),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        }
    }
}

fn analysis_parts(err: &AnalysisError) -> (StatusCode, &'static str, String) {
    match err {
        AnalysisError::NoFileProvided => (
            StatusCode::BAD_REQUEST,
            "NO_FILE_PROVIDED",
            "No file uploaded".to_string(),
        ),
        AnalysisError::Storage(e) => {
            tracing::error!("Staging error: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
                "The uploaded file could not be stored".to_string(),
            )
        }
        AnalysisError::Spawn { program, source } => {
            tracing::error!("Failed to launch classification engine '{program}': {source}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "ENGINE_UNAVAILABLE",
                "The classification engine could not be started".to_string(),
            )
        }
        AnalysisError::ProcessFailure { diagnostic, .. } => {
            tracing::warn!("Classification engine failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "PROCESS_FAILURE",
                diagnostic.clone(),
            )
        }
        AnalysisError::Timeout(limit) => {
            tracing::error!("Classification engine timed out after {limit:?}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "ENGINE_TIMEOUT",
                format!(
                    "The classification engine did not finish within {}s",
                    limit.as_secs()
                ),
            )
        }
        AnalysisError::MalformedOutput(diagnostic) => {
            tracing::warn!("Classification engine returned malformed output: {diagnostic}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "MALFORMED_OUTPUT",
                diagnostic.clone(),
            )
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_client_error() {
            tracing::info!("Rejected request: {self}");
        }
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
