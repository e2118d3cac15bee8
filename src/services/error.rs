//! Request error taxonomy and response mapping.
//!
//! Every handler returns `Result<_, ApiError>`; the `IntoResponse` impl maps
//! each kind to a status code and a JSON body carrying the message. Upstream
//! failures (database, media storage) are logged and surfaced as 500 without
//! retry.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Conflict(&'static str),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    Internal(String),
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Database(e) if is_unique_violation(e) => {
                (StatusCode::CONFLICT, "resource already exists".to_string())
            }
            ApiError::Database(_) | ApiError::Storage(_) | ApiError::Internal(_) => {
                tracing::error!(error = %self, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::NotFound("video"), StatusCode::NOT_FOUND),
            (ApiError::Forbidden("not the owner"), StatusCode::FORBIDDEN),
            (
                ApiError::InvalidArgument("bad id".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Conflict("username or email already exists"),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::Unauthorized("invalid access token"),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ApiError::Storage("gcs write failed".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_not_found_message_names_resource() {
        assert_eq!(
            ApiError::NotFound("playlist").to_string(),
            "playlist not found"
        );
    }
}
