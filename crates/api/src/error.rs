use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use sources_core::error::CoreError;
use sources_core::model::ModelError;
use sources_pipeline::artifact::ArtifactError;

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain, store and database errors and adds HTTP-specific
/// variants. Implements [`IntoResponse`] to produce consistent JSON error
/// responses of the form `{ "error": ..., "code": ... }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `sources_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A model artifact could not be found, read, written or fitted.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// The forecasting model rejected the data.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),

            AppError::Database(err) => internal(err),

            // --- Artifact store errors ---
            AppError::Artifact(err) => match err {
                ArtifactError::NotFound { .. } => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
                }
                ArtifactError::InvalidName(core) => classify_core_error(core),
                ArtifactError::Model(model) => model_error(model),
                ArtifactError::Io { .. }
                | ArtifactError::Decode { .. }
                | ArtifactError::UnsupportedVersion { .. } => internal(err),
            },

            AppError::Model(err) => model_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => internal(msg),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn classify_core_error(err: &CoreError) -> (StatusCode, &'static str, String) {
    match err {
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
    }
}

fn model_error(err: &ModelError) -> (StatusCode, &'static str, String) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        "MODEL_ERROR",
        err.to_string(),
    )
}

/// Log the detail and return a sanitized 500.
fn internal(detail: &dyn std::fmt::Display) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %detail, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
