//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that converts every failure into the
//! `{success: false, error}` JSON envelope with the right status code,
//! capturing server errors to Sentry before responding. All route handlers
//! return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use scanbridge_core::ApiResponse;

use crate::store::StoreError;

/// Application-level error type for the card API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Card store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Bad request from the client; the message is user-facing.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Delete attempted without an owner token.
    #[error("unauthorized")]
    Unauthorized,
}

impl AppError {
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Store(StoreError::Kv(_) | StoreError::Serialize(_))
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry; client errors are just noise.
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let (status, message) = match &self {
            Self::Store(err) => match err {
                StoreError::MissingFields => {
                    (StatusCode::BAD_REQUEST, "Missing required fields".to_owned())
                }
                StoreError::PayloadTooLarge { .. } => (
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "Imagen demasiado grande (máximo 2MB)".to_owned(),
                ),
                StoreError::QuotaExceeded { .. } => (
                    StatusCode::FORBIDDEN,
                    "Límite de 10 tarjetas alcanzado".to_owned(),
                ),
                StoreError::NotFound => {
                    (StatusCode::NOT_FOUND, "Tarjeta no encontrada".to_owned())
                }
                StoreError::Forbidden => (
                    StatusCode::FORBIDDEN,
                    "No tienes permiso para eliminar esta tarjeta".to_owned(),
                ),
                // Don't expose internal error details to clients.
                StoreError::Kv(_) | StoreError::Serialize(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_owned(),
                ),
            },
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "No autorizado".to_owned()),
        };

        (status, Json(ApiResponse::<()>::err(message))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
