//! User profile endpoints (/users/*): account details, media, channel
//! profile, and watch history

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    routing::{get, patch},
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

use super::auth::AuthUser;
use super::dto::WatchHistoryItem;
use super::{bad_multipart, read_media_field};
use crate::AppState;
use crate::domain::users::{self, ChannelProfile, PublicUser};
use crate::services::error::ApiError;
use crate::storage::{media_path, user_scope};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/current-user", get(current_user))
        .route("/users/update-account", patch(update_account))
        .route("/users/update-avatar", patch(update_avatar))
        .route("/users/update-cover-image", patch(update_cover_image))
        .route("/users/c/{username}", get(channel_profile))
        .route("/users/history", get(watch_history))
}

/// GET /users/current-user
async fn current_user(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    // A valid JWT for a deleted user is still unauthorized
    let user = users::get_public(&state.db, user_id)
        .await?
        .ok_or(ApiError::Unauthorized("invalid access token"))?;
    Ok(Json(user))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateAccountRequest {
    full_name: Option<String>,
    email: Option<String>,
}

/// PATCH /users/update-account - fullName and/or email
async fn update_account(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<UpdateAccountRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    if let Some(email) = req.email.as_deref()
        && !email.contains('@')
    {
        return Err(ApiError::InvalidArgument("email is invalid".to_string()));
    }

    let user = users::update_account(
        &state.db,
        user_id,
        req.full_name.as_deref(),
        req.email.as_deref(),
    )
    .await?
    .ok_or(ApiError::Unauthorized("invalid access token"))?;

    Ok(Json(user))
}

/// Pull the single expected image field out of a multipart body.
async fn single_image_field(
    mut multipart: Multipart,
    field_name: &'static str,
) -> Result<(String, bytes::Bytes), ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        if field.name() == Some(field_name) {
            return read_media_field(field, "image/", field_name).await;
        }
    }
    Err(ApiError::InvalidArgument(format!(
        "{field_name} image is required"
    )))
}

/// PATCH /users/update-avatar - multipart single image field "avatar"
async fn update_avatar(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    multipart: Multipart,
) -> Result<Json<PublicUser>, ApiError> {
    let (content_type, data) = single_image_field(multipart, "avatar").await?;
    let url = state
        .storage
        .upload(
            &media_path("avatar", &user_scope(user_id), &content_type, Utc::now()),
            data,
        )
        .await?;

    let user = users::set_avatar(&state.db, user_id, &url)
        .await?
        .ok_or(ApiError::Unauthorized("invalid access token"))?;
    Ok(Json(user))
}

/// PATCH /users/update-cover-image - multipart single image field "coverImage"
async fn update_cover_image(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    multipart: Multipart,
) -> Result<Json<PublicUser>, ApiError> {
    let (content_type, data) = single_image_field(multipart, "coverImage").await?;
    let url = state
        .storage
        .upload(
            &media_path("cover", &user_scope(user_id), &content_type, Utc::now()),
            data,
        )
        .await?;

    let user = users::set_cover_image(&state.db, user_id, &url)
        .await?
        .ok_or(ApiError::Unauthorized("invalid access token"))?;
    Ok(Json(user))
}

/// GET /users/c/{username} - channel profile with subscription enrichment
async fn channel_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(viewer_id): AuthUser,
    Path(username): Path<String>,
) -> Result<Json<ChannelProfile>, ApiError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ApiError::InvalidArgument("username is required".to_string()));
    }

    let profile = users::channel_profile(&state.db, username, Some(viewer_id))
        .await?
        .ok_or(ApiError::NotFound("channel"))?;

    Ok(Json(profile))
}

/// GET /users/history - watch history, most recent first
async fn watch_history(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<WatchHistoryItem>>, ApiError> {
    let entries = users::watch_history(&state.db, user_id).await?;
    Ok(Json(entries.into_iter().map(WatchHistoryItem::from).collect()))
}
