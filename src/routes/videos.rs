//! Video endpoints (/videos/*): feed, publish, detail, edit, delete,
//! publish toggle

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
};
use bytes::Bytes;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;

use super::auth::AuthUser;
use super::dto::VideoSummary;
use super::{bad_multipart, read_media_field, required_text};
use crate::AppState;
use crate::domain::users;
use crate::domain::videos::{self, Video, VideoFeedRow};
use crate::pagination::{PageLabels, PageParams, paginate};
use crate::services::error::ApiError;
use crate::storage::{media_path, user_scope};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/videos", get(list_videos).post(publish_video))
        .route(
            "/videos/{id}",
            get(get_video).patch(update_video).delete(delete_video),
        )
        .route("/videos/toggle/publish/{id}", patch(toggle_publish))
}

const FEED_LABELS: PageLabels = PageLabels {
    docs: "videos",
    total_docs: "totalVideos",
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoFeedQuery {
    page: Option<String>,
    limit: Option<String>,
    query: Option<String>,
    sort_by: Option<String>,
    sort_type: Option<String>,
    user_id: Option<String>,
}

/// GET /videos - published-video feed with filter/sort/pagination
async fn list_videos(
    State(state): State<Arc<AppState>>,
    AuthUser(_user_id): AuthUser,
    Query(query): Query<VideoFeedQuery>,
) -> Result<Json<Value>, ApiError> {
    let pipeline = videos::feed_pipeline(
        query.query.as_deref(),
        query.sort_by.as_deref(),
        query.sort_type.as_deref(),
        query.user_id.as_deref(),
    );
    let request = PageParams {
        page: query.page,
        limit: query.limit,
    }
    .normalize();

    let page = paginate::<VideoFeedRow>(&state.db, &pipeline, request).await?;
    Ok(Json(page.map(VideoSummary::from).into_envelope(FEED_LABELS)))
}

/// POST /videos - multipart publish: title, description, optional duration,
/// video file, thumbnail image
async fn publish_video(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Video>), ApiError> {
    let mut title = None;
    let mut description = None;
    let mut duration = 0.0_f64;
    let mut video_file: Option<(String, Bytes)> = None;
    let mut thumbnail: Option<(String, Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "title" => title = Some(field.text().await.map_err(bad_multipart)?),
            "description" => description = Some(field.text().await.map_err(bad_multipart)?),
            "duration" => {
                duration = field
                    .text()
                    .await
                    .map_err(bad_multipart)?
                    .trim()
                    .parse()
                    .unwrap_or(0.0);
            }
            "video" => video_file = Some(read_media_field(field, "video/", "video").await?),
            "thumbnail" => {
                thumbnail = Some(read_media_field(field, "image/", "thumbnail").await?);
            }
            _ => {}
        }
    }

    let title = required_text(title, "title")?;
    let description = required_text(description, "description")?;
    let (video_type, video_bytes) = video_file.ok_or_else(|| {
        ApiError::InvalidArgument("video file and thumbnail are required".to_string())
    })?;
    let (thumbnail_type, thumbnail_bytes) = thumbnail.ok_or_else(|| {
        ApiError::InvalidArgument("video file and thumbnail are required".to_string())
    })?;

    let scope = user_scope(user_id);
    let video_url = state
        .storage
        .upload(&media_path("video", &scope, &video_type, Utc::now()), video_bytes)
        .await?;
    let thumbnail_url = state
        .storage
        .upload(
            &media_path("thumbnail", &scope, &thumbnail_type, Utc::now()),
            thumbnail_bytes,
        )
        .await?;

    let video = videos::create_video(
        &state.db,
        user_id,
        &video_url,
        &thumbnail_url,
        &title,
        &description,
        duration,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(video)))
}

/// GET /videos/{id} - published video detail; counts the view and records
/// watch history
async fn get_video(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(video_id): Path<i64>,
) -> Result<Json<Video>, ApiError> {
    let mut video = videos::find_published(&state.db, video_id)
        .await?
        .ok_or(ApiError::NotFound("video"))?;

    videos::increment_views(&state.db, video.id).await?;
    users::record_watch(&state.db, user_id, video.id).await?;
    video.views += 1;

    Ok(Json(video))
}

/// Fetch a video and require the caller to own it: 404 before 403.
async fn owned_video(db: &PgPool, video_id: i64, user_id: i64) -> Result<Video, ApiError> {
    let video = videos::find_by_id(db, video_id)
        .await?
        .ok_or(ApiError::NotFound("video"))?;
    if video.owner_id != user_id {
        return Err(ApiError::Forbidden("not authorized to modify this video"));
    }
    Ok(video)
}

/// PATCH /videos/{id} - multipart edit: title, description, and/or a new
/// thumbnail image; owner only
async fn update_video(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(video_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<Video>, ApiError> {
    owned_video(&state.db, video_id, user_id).await?;

    let mut title = None;
    let mut description = None;
    let mut thumbnail: Option<(String, Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "title" => title = Some(field.text().await.map_err(bad_multipart)?),
            "description" => description = Some(field.text().await.map_err(bad_multipart)?),
            "thumbnail" => {
                thumbnail = Some(read_media_field(field, "image/", "thumbnail").await?);
            }
            _ => {}
        }
    }

    let title = title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    let description = description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    let thumbnail_url = match thumbnail {
        Some((content_type, bytes)) => Some(
            state
                .storage
                .upload(
                    &media_path("thumbnail", &user_scope(user_id), &content_type, Utc::now()),
                    bytes,
                )
                .await?,
        ),
        None => None,
    };

    let video = videos::update_details(
        &state.db,
        video_id,
        title.as_deref(),
        description.as_deref(),
        thumbnail_url.as_deref(),
    )
    .await?;

    Ok(Json(video))
}

/// DELETE /videos/{id} - owner only
async fn delete_video(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(video_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    owned_video(&state.db, video_id, user_id).await?;
    videos::delete_video(&state.db, video_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /videos/toggle/publish/{id} - owner only
async fn toggle_publish(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(video_id): Path<i64>,
) -> Result<Json<Video>, ApiError> {
    owned_video(&state.db, video_id, user_id).await?;
    let video = videos::toggle_publish(&state.db, video_id).await?;
    Ok(Json(video))
}
