//! Subscription endpoints (/subscriptions/*)

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use super::auth::AuthUser;
use super::dto::ToggleResponse;
use crate::AppState;
use crate::domain::subscriptions::{self, SubscriptionEntry};
use crate::domain::users;
use crate::services::error::ApiError;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/subscriptions/c/{channel_id}",
            post(toggle_subscription).get(channel_subscribers),
        )
        .route("/subscriptions/u/{subscriber_id}", get(subscribed_channels))
}

/// POST /subscriptions/c/{channelId} - toggle the caller's subscription
async fn toggle_subscription(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(channel_id): Path<i64>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let channel = users::get_public(&state.db, channel_id)
        .await?
        .ok_or(ApiError::NotFound("channel"))?;

    if channel.id == user_id {
        return Err(ApiError::InvalidArgument(
            "cannot subscribe to your own channel".to_string(),
        ));
    }

    let subscribed = subscriptions::toggle(&state.db, user_id, channel.id).await?;
    Ok(Json(ToggleResponse {
        active: subscribed,
        message: if subscribed {
            "Subscribed successfully"
        } else {
            "Unsubscribed successfully"
        },
    }))
}

/// One entry in a subscriber or channel listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionItem {
    id: i64,
    username: String,
    full_name: String,
    avatar: String,
    since: DateTime<Utc>,
}

impl From<SubscriptionEntry> for SubscriptionItem {
    fn from(entry: SubscriptionEntry) -> Self {
        Self {
            id: entry.user_id,
            username: entry.username,
            full_name: entry.full_name,
            avatar: entry.avatar,
            since: entry.since,
        }
    }
}

#[derive(Debug, Serialize)]
struct SubscribersResponse {
    count: i64,
    subscribers: Vec<SubscriptionItem>,
}

/// GET /subscriptions/c/{channelId} - subscriber list of a channel
async fn channel_subscribers(
    State(state): State<Arc<AppState>>,
    AuthUser(_viewer): AuthUser,
    Path(channel_id): Path<i64>,
) -> Result<Json<SubscribersResponse>, ApiError> {
    let channel = users::get_public(&state.db, channel_id)
        .await?
        .ok_or(ApiError::NotFound("channel"))?;

    let count = subscriptions::count_subscribers(&state.db, channel.id).await?;
    let subscribers = subscriptions::subscribers_of(&state.db, channel.id)
        .await?
        .into_iter()
        .map(SubscriptionItem::from)
        .collect();

    Ok(Json(SubscribersResponse { count, subscribers }))
}

#[derive(Debug, Serialize)]
struct ChannelsResponse {
    count: i64,
    channels: Vec<SubscriptionItem>,
}

/// GET /subscriptions/u/{subscriberId} - channels a user subscribes to
async fn subscribed_channels(
    State(state): State<Arc<AppState>>,
    AuthUser(_viewer): AuthUser,
    Path(subscriber_id): Path<i64>,
) -> Result<Json<ChannelsResponse>, ApiError> {
    let user = users::get_public(&state.db, subscriber_id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    let count = subscriptions::count_subscriptions(&state.db, user.id).await?;
    let channels = subscriptions::channels_of(&state.db, user.id)
        .await?
        .into_iter()
        .map(SubscriptionItem::from)
        .collect();

    Ok(Json(ChannelsResponse { count, channels }))
}
