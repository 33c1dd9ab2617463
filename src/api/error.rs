use axum::{http::StatusCode, response::Json};
use serde_json::json;
use tracing::error;

use crate::error::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message) = match &self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
            ),
            ApiError::Core(err) => match err {
                CoreError::Validation { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
                CoreError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
                CoreError::CapacityExceeded { .. } => (StatusCode::CONFLICT, err.to_string()),
                CoreError::InvalidTransition { .. } => (StatusCode::CONFLICT, err.to_string()),
                CoreError::Conflict(_) => (StatusCode::CONFLICT, err.to_string()),
                CoreError::Forbidden(_) => (StatusCode::FORBIDDEN, err.to_string()),
                CoreError::Database(err) => {
                    error!("database error: {err}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                    )
                }
            },
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
