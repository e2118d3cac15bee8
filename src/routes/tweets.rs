//! Tweet endpoints (/tweets/*)

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::auth::AuthUser;
use super::bounded_content;
use super::dto::TweetItem;
use crate::AppState;
use crate::constants::MAX_CONTENT_LENGTH;
use crate::domain::tweets::{self, Tweet, TweetFeedRow};
use crate::pagination::{PageLabels, PageParams, paginate};
use crate::services::error::ApiError;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tweets", post(create_tweet))
        .route("/tweets/user/{user_id}", get(user_tweets))
        .route("/tweets/{id}", patch(update_tweet).delete(delete_tweet))
}

const TWEET_LABELS: PageLabels = PageLabels {
    docs: "tweets",
    total_docs: "totalTweets",
};

#[derive(Deserialize)]
struct TweetRequest {
    content: String,
}

/// POST /tweets
async fn create_tweet(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<TweetRequest>,
) -> Result<(StatusCode, Json<Tweet>), ApiError> {
    let content = bounded_content(&req.content, MAX_CONTENT_LENGTH, "content")?;
    let tweet = tweets::create_tweet(&state.db, user_id, &content).await?;
    Ok((StatusCode::CREATED, Json(tweet)))
}

/// GET /tweets/user/{userId} - paginated tweets of one user
async fn user_tweets(
    State(state): State<Arc<AppState>>,
    AuthUser(_viewer): AuthUser,
    Path(user_id): Path<i64>,
    Query(params): Query<PageParams>,
) -> Result<Json<Value>, ApiError> {
    let pipeline = tweets::user_tweets_pipeline(user_id);
    let page = paginate::<TweetFeedRow>(&state.db, &pipeline, params.normalize()).await?;
    Ok(Json(page.map(TweetItem::from).into_envelope(TWEET_LABELS)))
}

/// Fetch a tweet and require the caller to own it: 404 before 403.
async fn owned_tweet(
    state: &AppState,
    tweet_id: i64,
    user_id: i64,
) -> Result<Tweet, ApiError> {
    let tweet = tweets::find_by_id(&state.db, tweet_id)
        .await?
        .ok_or(ApiError::NotFound("tweet"))?;
    if tweet.owner_id != user_id {
        return Err(ApiError::Forbidden("not authorized to modify this tweet"));
    }
    Ok(tweet)
}

/// PATCH /tweets/{id} - owner only
async fn update_tweet(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(tweet_id): Path<i64>,
    Json(req): Json<TweetRequest>,
) -> Result<Json<Tweet>, ApiError> {
    owned_tweet(&state, tweet_id, user_id).await?;
    let content = bounded_content(&req.content, MAX_CONTENT_LENGTH, "content")?;
    let tweet = tweets::update_content(&state.db, tweet_id, &content).await?;
    Ok(Json(tweet))
}

/// DELETE /tweets/{id} - owner only
async fn delete_tweet(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(tweet_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    owned_tweet(&state, tweet_id, user_id).await?;
    tweets::delete_tweet(&state.db, tweet_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
