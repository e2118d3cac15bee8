//! Playlist endpoints (/playlists/*)

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::auth::AuthUser;
use super::bounded_content;
use super::dto::{OwnerSummary, VideoSummary};
use crate::AppState;
use crate::constants::{MAX_PLAYLIST_DESCRIPTION_LENGTH, MAX_PLAYLIST_NAME_LENGTH};
use crate::domain::playlists::{self, Playlist, PlaylistSummaryRow, PlaylistVideoRow};
use crate::domain::{users, videos};
use crate::pagination::{self, PageLabels, PageParams, paginate};
use crate::services::error::ApiError;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/playlists", post(create_playlist))
        .route(
            "/playlists/{id}",
            get(get_playlist).patch(update_playlist).delete(delete_playlist),
        )
        .route("/playlists/add/{video_id}/{playlist_id}", patch(add_video))
        .route(
            "/playlists/remove/{video_id}/{playlist_id}",
            patch(remove_video),
        )
        .route("/playlists/user/{user_id}", get(user_playlists))
}

const PLAYLIST_LABELS: PageLabels = PageLabels {
    docs: "playlists",
    total_docs: "totalPlaylists",
};

#[derive(Deserialize)]
struct CreatePlaylistRequest {
    name: String,
    description: String,
}

/// POST /playlists
async fn create_playlist(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CreatePlaylistRequest>,
) -> Result<(StatusCode, Json<Playlist>), ApiError> {
    let name = bounded_content(&req.name, MAX_PLAYLIST_NAME_LENGTH, "name")?;
    let description = bounded_content(
        &req.description,
        MAX_PLAYLIST_DESCRIPTION_LENGTH,
        "description",
    )?;

    let playlist = playlists::create_playlist(&state.db, user_id, &name, &description).await?;
    Ok((StatusCode::CREATED, Json(playlist)))
}

/// GET /playlists/user/{userId} - paginated summaries with video counts
async fn user_playlists(
    State(state): State<Arc<AppState>>,
    AuthUser(_viewer): AuthUser,
    Path(user_id): Path<i64>,
    Query(params): Query<PageParams>,
) -> Result<Json<Value>, ApiError> {
    let pipeline = playlists::user_playlists_pipeline(user_id);
    let page = paginate::<PlaylistSummaryRow>(&state.db, &pipeline, params.normalize()).await?;
    Ok(Json(page.into_envelope(PLAYLIST_LABELS)))
}

/// Playlist detail: metadata, projected owner, and contents in order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistDetail {
    id: i64,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    owner: OwnerSummary,
    videos: Vec<VideoSummary>,
}

/// GET /playlists/{id}
async fn get_playlist(
    State(state): State<Arc<AppState>>,
    AuthUser(_viewer): AuthUser,
    Path(playlist_id): Path<i64>,
) -> Result<Json<PlaylistDetail>, ApiError> {
    let playlist = playlists::find_by_id(&state.db, playlist_id)
        .await?
        .ok_or(ApiError::NotFound("playlist"))?;

    let owner = users::get_public(&state.db, playlist.owner_id)
        .await?
        .ok_or(ApiError::NotFound("playlist"))?;

    let pipeline = playlists::playlist_videos_pipeline(playlist.id);
    let rows: Vec<PlaylistVideoRow> = pagination::fetch_all(&state.db, &pipeline).await?;

    Ok(Json(PlaylistDetail {
        id: playlist.id,
        name: playlist.name,
        description: playlist.description,
        created_at: playlist.created_at,
        updated_at: playlist.updated_at,
        owner: OwnerSummary {
            id: Some(owner.id),
            username: owner.username,
            full_name: Some(owner.full_name),
            avatar: owner.avatar,
        },
        videos: rows.into_iter().map(VideoSummary::from).collect(),
    }))
}

/// Fetch a playlist and require the caller to own it: 404 before 403.
async fn owned_playlist(
    state: &AppState,
    playlist_id: i64,
    user_id: i64,
) -> Result<Playlist, ApiError> {
    let playlist = playlists::find_by_id(&state.db, playlist_id)
        .await?
        .ok_or(ApiError::NotFound("playlist"))?;
    if playlist.owner_id != user_id {
        return Err(ApiError::Forbidden("not authorized to modify this playlist"));
    }
    Ok(playlist)
}

#[derive(Deserialize)]
struct UpdatePlaylistRequest {
    name: Option<String>,
    description: Option<String>,
}

/// PATCH /playlists/{id} - owner only; partial update
async fn update_playlist(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(playlist_id): Path<i64>,
    Json(req): Json<UpdatePlaylistRequest>,
) -> Result<Json<Playlist>, ApiError> {
    owned_playlist(&state, playlist_id, user_id).await?;

    let name = req
        .name
        .as_deref()
        .map(|n| bounded_content(n, MAX_PLAYLIST_NAME_LENGTH, "name"))
        .transpose()?;
    let description = req
        .description
        .as_deref()
        .map(|d| bounded_content(d, MAX_PLAYLIST_DESCRIPTION_LENGTH, "description"))
        .transpose()?;

    let playlist = playlists::update_playlist(
        &state.db,
        playlist_id,
        name.as_deref(),
        description.as_deref(),
    )
    .await?;

    Ok(Json(playlist))
}

/// DELETE /playlists/{id} - owner only
async fn delete_playlist(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(playlist_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    owned_playlist(&state, playlist_id, user_id).await?;
    playlists::delete_playlist(&state.db, playlist_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /playlists/add/{videoId}/{playlistId} - owner only; duplicate-safe
async fn add_video(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path((video_id, playlist_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    owned_playlist(&state, playlist_id, user_id).await?;
    let video = videos::find_published(&state.db, video_id)
        .await?
        .ok_or(ApiError::NotFound("video"))?;

    playlists::add_video(&state.db, playlist_id, video.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /playlists/remove/{videoId}/{playlistId} - owner only; idempotent
async fn remove_video(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path((video_id, playlist_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    owned_playlist(&state, playlist_id, user_id).await?;
    playlists::remove_video(&state.db, playlist_id, video_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
