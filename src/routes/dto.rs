//! Shared API response DTOs
//!
//! List pipelines return flat rows (joined owner columns aliased in); these
//! DTOs nest the owner back into an object for the wire format. Optional
//! fields mirror the per-view projections: a view that never selects a
//! column never serializes it.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::comments::CommentFeedRow;
use crate::domain::likes::LikedVideoRow;
use crate::domain::playlists::PlaylistVideoRow;
use crate::domain::tweets::TweetFeedRow;
use crate::domain::users::WatchHistoryEntry;
use crate::domain::videos::VideoFeedRow;

/// Projected owner subset. Which fields are present depends on the view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub avatar: String,
}

/// Video list-view summary with nested owner.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSummary {
    pub id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub thumbnail: String,
    pub duration: f64,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub owner: OwnerSummary,
}

impl From<VideoFeedRow> for VideoSummary {
    fn from(row: VideoFeedRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: Some(row.description),
            thumbnail: row.thumbnail,
            duration: row.duration,
            views: row.views,
            created_at: row.created_at,
            owner: OwnerSummary {
                id: Some(row.owner_id),
                username: row.owner_username,
                full_name: Some(row.owner_full_name),
                avatar: row.owner_avatar,
            },
        }
    }
}

impl From<PlaylistVideoRow> for VideoSummary {
    fn from(row: PlaylistVideoRow) -> Self {
        Self {
            id: row.video_id,
            title: row.title,
            description: None,
            thumbnail: row.thumbnail,
            duration: row.duration,
            views: row.views,
            created_at: row.created_at,
            owner: OwnerSummary {
                id: Some(row.owner_id),
                username: row.owner_username,
                full_name: Some(row.owner_full_name),
                avatar: row.owner_avatar,
            },
        }
    }
}

/// Tweet list item (GET /tweets/user/{userId})
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetItem {
    pub id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner: OwnerSummary,
}

impl From<TweetFeedRow> for TweetItem {
    fn from(row: TweetFeedRow) -> Self {
        Self {
            id: row.id,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
            owner: OwnerSummary {
                id: Some(row.owner_id),
                username: row.owner_username,
                full_name: None,
                avatar: row.owner_avatar,
            },
        }
    }
}

/// Comment list item (GET /comments/{videoId})
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentItem {
    pub id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner: OwnerSummary,
}

impl From<CommentFeedRow> for CommentItem {
    fn from(row: CommentFeedRow) -> Self {
        Self {
            id: row.id,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
            owner: OwnerSummary {
                id: Some(row.owner_id),
                username: row.owner_username,
                full_name: None,
                avatar: row.owner_avatar,
            },
        }
    }
}

/// Liked-video item (GET /likes/videos)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikedVideoItem {
    pub liked_at: DateTime<Utc>,
    pub video: VideoSummary,
}

impl From<LikedVideoRow> for LikedVideoItem {
    fn from(row: LikedVideoRow) -> Self {
        Self {
            liked_at: row.liked_at,
            video: VideoSummary {
                id: row.video_id,
                title: row.title,
                description: Some(row.description),
                thumbnail: row.thumbnail,
                duration: row.duration,
                views: row.views,
                created_at: row.created_at,
                owner: OwnerSummary {
                    id: None,
                    username: row.owner_username,
                    full_name: None,
                    avatar: row.owner_avatar,
                },
            },
        }
    }
}

/// Watch-history item (GET /users/history)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchHistoryItem {
    pub watched_at: DateTime<Utc>,
    pub video: VideoSummary,
}

impl From<WatchHistoryEntry> for WatchHistoryItem {
    fn from(entry: WatchHistoryEntry) -> Self {
        Self {
            watched_at: entry.watched_at,
            video: VideoSummary {
                id: entry.video_id,
                title: entry.title,
                description: None,
                thumbnail: entry.thumbnail,
                duration: entry.duration,
                views: entry.views,
                created_at: entry.created_at,
                owner: OwnerSummary {
                    id: None,
                    username: entry.owner_username,
                    full_name: Some(entry.owner_full_name),
                    avatar: entry.owner_avatar,
                },
            },
        }
    }
}

/// Toggle response for likes and subscriptions.
#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub active: bool,
    pub message: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_summary_omits_absent_fields() {
        let owner = OwnerSummary {
            id: None,
            username: "alice".into(),
            full_name: None,
            avatar: "a.png".into(),
        };
        let json = serde_json::to_value(&owner).unwrap();
        assert!(json.get("id").is_none());
        assert!(json.get("fullName").is_none());
        assert_eq!(json["username"], "alice");
    }

    #[test]
    fn test_feed_item_nests_owner_and_never_leaks_credentials() {
        let item = VideoSummary::from(VideoFeedRow {
            id: 1,
            title: "t".into(),
            description: "d".into(),
            thumbnail: "th.png".into(),
            duration: 2.0,
            views: 3,
            created_at: Utc::now(),
            owner_id: 4,
            owner_username: "bob".into(),
            owner_full_name: "Bob B".into(),
            owner_avatar: "b.png".into(),
        });
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["owner"]["username"], "bob");
        assert_eq!(json["owner"]["fullName"], "Bob B");
        let rendered = json.to_string();
        assert!(!rendered.contains("password"));
        assert!(!rendered.contains("refreshToken"));
    }
}
