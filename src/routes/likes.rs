//! Like endpoints (/likes/*): toggles and the liked-videos view

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde_json::Value;
use std::sync::Arc;

use super::auth::AuthUser;
use super::dto::{LikedVideoItem, ToggleResponse};
use crate::AppState;
use crate::domain::likes::{self, LikeTarget, LikedVideoRow};
use crate::domain::{comments, tweets, videos};
use crate::pagination::{PageLabels, PageParams, paginate};
use crate::services::error::ApiError;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/likes/toggle/v/{video_id}", post(toggle_video_like))
        .route("/likes/toggle/c/{comment_id}", post(toggle_comment_like))
        .route("/likes/toggle/t/{tweet_id}", post(toggle_tweet_like))
        .route("/likes/videos", get(liked_videos))
}

const LIKED_LABELS: PageLabels = PageLabels {
    docs: "videos",
    total_docs: "totalVideos",
};

/// POST /likes/toggle/v/{videoId}
async fn toggle_video_like(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(video_id): Path<i64>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let video = videos::find_published(&state.db, video_id)
        .await?
        .ok_or(ApiError::NotFound("video"))?;

    let liked = likes::toggle(&state.db, LikeTarget::Video, video.id, user_id).await?;
    Ok(Json(ToggleResponse {
        active: liked,
        message: if liked { "Video liked" } else { "Video like removed" },
    }))
}

/// POST /likes/toggle/c/{commentId}
async fn toggle_comment_like(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(comment_id): Path<i64>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let comment = comments::find_by_id(&state.db, comment_id)
        .await?
        .ok_or(ApiError::NotFound("comment"))?;

    let liked = likes::toggle(&state.db, LikeTarget::Comment, comment.id, user_id).await?;
    Ok(Json(ToggleResponse {
        active: liked,
        message: if liked {
            "Comment liked"
        } else {
            "Comment like removed"
        },
    }))
}

/// POST /likes/toggle/t/{tweetId}
async fn toggle_tweet_like(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(tweet_id): Path<i64>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let tweet = tweets::find_by_id(&state.db, tweet_id)
        .await?
        .ok_or(ApiError::NotFound("tweet"))?;

    let liked = likes::toggle(&state.db, LikeTarget::Tweet, tweet.id, user_id).await?;
    Ok(Json(ToggleResponse {
        active: liked,
        message: if liked { "Tweet liked" } else { "Tweet like removed" },
    }))
}

/// GET /likes/videos - videos the caller has liked, paginated
async fn liked_videos(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<PageParams>,
) -> Result<Json<Value>, ApiError> {
    let pipeline = likes::liked_videos_pipeline(user_id);
    let page = paginate::<LikedVideoRow>(&state.db, &pipeline, params.normalize()).await?;
    Ok(Json(page.map(LikedVideoItem::from).into_envelope(LIKED_LABELS)))
}
