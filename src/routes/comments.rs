//! Comment endpoints (/comments/*)

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::auth::AuthUser;
use super::bounded_content;
use super::dto::CommentItem;
use crate::AppState;
use crate::constants::MAX_CONTENT_LENGTH;
use crate::domain::comments::{self, Comment, CommentFeedRow};
use crate::domain::videos;
use crate::pagination::{PageLabels, PageParams, paginate};
use crate::services::error::ApiError;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/comments/{video_id}",
            get(video_comments).post(add_comment),
        )
        .route(
            "/comments/c/{id}",
            patch(update_comment).delete(delete_comment),
        )
}

const COMMENT_LABELS: PageLabels = PageLabels {
    docs: "comments",
    total_docs: "totalComments",
};

#[derive(Deserialize)]
struct CommentRequest {
    content: String,
}

/// GET /comments/{videoId} - paginated comments for a published video
async fn video_comments(
    State(state): State<Arc<AppState>>,
    AuthUser(_viewer): AuthUser,
    Path(video_id): Path<i64>,
    Query(params): Query<PageParams>,
) -> Result<Json<Value>, ApiError> {
    videos::find_published(&state.db, video_id)
        .await?
        .ok_or(ApiError::NotFound("video"))?;

    let pipeline = comments::video_comments_pipeline(video_id);
    let page = paginate::<CommentFeedRow>(&state.db, &pipeline, params.normalize()).await?;
    Ok(Json(page.map(CommentItem::from).into_envelope(COMMENT_LABELS)))
}

/// POST /comments/{videoId}
async fn add_comment(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(video_id): Path<i64>,
    Json(req): Json<CommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let video = videos::find_published(&state.db, video_id)
        .await?
        .ok_or(ApiError::NotFound("video"))?;

    let content = bounded_content(&req.content, MAX_CONTENT_LENGTH, "content")?;
    let comment = comments::create_comment(&state.db, video.id, user_id, &content).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// Fetch a comment and require the caller to own it: 404 before 403.
async fn owned_comment(
    state: &AppState,
    comment_id: i64,
    user_id: i64,
) -> Result<Comment, ApiError> {
    let comment = comments::find_by_id(&state.db, comment_id)
        .await?
        .ok_or(ApiError::NotFound("comment"))?;
    if comment.owner_id != user_id {
        return Err(ApiError::Forbidden("not authorized to modify this comment"));
    }
    Ok(comment)
}

/// PATCH /comments/c/{id} - owner only
async fn update_comment(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(comment_id): Path<i64>,
    Json(req): Json<CommentRequest>,
) -> Result<Json<Comment>, ApiError> {
    owned_comment(&state, comment_id, user_id).await?;
    let content = bounded_content(&req.content, MAX_CONTENT_LENGTH, "content")?;
    let comment = comments::update_content(&state.db, comment_id, &content).await?;
    Ok(Json(comment))
}

/// DELETE /comments/c/{id} - owner only
async fn delete_comment(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(comment_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    owned_comment(&state, comment_id, user_id).await?;
    comments::delete_comment(&state.db, comment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
