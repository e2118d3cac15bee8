pub mod auth;
pub mod comments;
pub mod dto;
pub mod likes;
pub mod playlists;
pub mod subscriptions;
pub mod tweets;
pub mod users;
pub mod videos;

use axum::Router;
use axum::extract::multipart::{Field, MultipartError};
use axum::routing::get;
use bytes::Bytes;
use std::sync::Arc;

use crate::AppState;
use crate::services::error::ApiError;

/// Build all routes for the API
pub fn build_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/healthcheck", get(healthcheck))
        .merge(auth::routes())
        .merge(users::routes())
        .merge(videos::routes())
        .merge(tweets::routes())
        .merge(comments::routes())
        .merge(likes::routes())
        .merge(playlists::routes())
        .merge(subscriptions::routes())
}

async fn healthcheck() -> &'static str {
    "ok"
}

pub(crate) fn bad_multipart(err: MultipartError) -> ApiError {
    ApiError::InvalidArgument(format!("malformed multipart body: {err}"))
}

/// Read a file field, enforcing its mime class (`"image/"`, `"video/"`).
pub(crate) async fn read_media_field(
    field: Field<'_>,
    expected_prefix: &str,
    field_name: &'static str,
) -> Result<(String, Bytes), ApiError> {
    let content_type = field.content_type().unwrap_or_default().to_string();
    if !content_type.starts_with(expected_prefix) {
        return Err(ApiError::InvalidArgument(format!(
            "{field_name} must be a {} file",
            expected_prefix.trim_end_matches('/')
        )));
    }
    let data = field.bytes().await.map_err(bad_multipart)?;
    if data.is_empty() {
        return Err(ApiError::InvalidArgument(format!(
            "{field_name} file is required"
        )));
    }
    Ok((content_type, data))
}

/// Trim a required text input, rejecting blank values.
pub(crate) fn required_text(value: Option<String>, name: &'static str) -> Result<String, ApiError> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    value.ok_or_else(|| ApiError::InvalidArgument(format!("{name} is required")))
}

/// Validate bounded text content (tweets, comments, playlist fields).
pub(crate) fn bounded_content(
    content: &str,
    max: usize,
    name: &'static str,
) -> Result<String, ApiError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ApiError::InvalidArgument(format!("{name} is required")));
    }
    if content.chars().count() > max {
        return Err(ApiError::InvalidArgument(format!(
            "{name} must be between 1 and {max} characters"
        )));
    }
    Ok(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text_trims_and_rejects_blank() {
        assert_eq!(required_text(Some("  x ".into()), "title").unwrap(), "x");
        assert!(required_text(Some("   ".into()), "title").is_err());
        assert!(required_text(None, "title").is_err());
    }

    #[test]
    fn test_bounded_content_limits() {
        assert!(bounded_content(&"a".repeat(1000), 1000, "content").is_ok());
        assert!(bounded_content(&"a".repeat(1001), 1000, "content").is_err());
        assert!(bounded_content("", 1000, "content").is_err());
    }
}
