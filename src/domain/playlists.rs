//! Playlist domain - DB queries, membership writes, and list pipelines
//!
//! Playlist membership lives in `playlist_videos`, ordered by `position`.
//! Adding is duplicate-safe (ON CONFLICT DO NOTHING), removal is idempotent.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Executor, Postgres};

use crate::query::{Bind, Computed, Pipeline, Predicate, SortDir};

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub async fn create_playlist<'e, E>(
    executor: E,
    owner_id: i64,
    name: &str,
    description: &str,
) -> Result<Playlist, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        "INSERT INTO playlists (name, description, owner_id) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(name)
    .bind(description)
    .bind(owner_id)
    .fetch_one(executor)
    .await
}

pub async fn find_by_id<'e, E>(
    executor: E,
    playlist_id: i64,
) -> Result<Option<Playlist>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as("SELECT * FROM playlists WHERE id = $1")
        .bind(playlist_id)
        .fetch_optional(executor)
        .await
}

/// Update name/description; absent fields keep their value. Ownership is
/// checked by the caller.
pub async fn update_playlist<'e, E>(
    executor: E,
    playlist_id: i64,
    name: Option<&str>,
    description: Option<&str>,
) -> Result<Playlist, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        UPDATE playlists
        SET name = COALESCE($2, name),
            description = COALESCE($3, description),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(playlist_id)
    .bind(name)
    .bind(description)
    .fetch_one(executor)
    .await
}

pub async fn delete_playlist<'e, E>(executor: E, playlist_id: i64) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query("DELETE FROM playlists WHERE id = $1")
        .bind(playlist_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Append a video to a playlist. Re-adding an existing video is a no-op.
pub async fn add_video<'e, E>(
    executor: E,
    playlist_id: i64,
    video_id: i64,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO playlist_videos (playlist_id, video_id, position)
        SELECT $1, $2, COALESCE(MAX(position) + 1, 0)
        FROM playlist_videos WHERE playlist_id = $1
        ON CONFLICT (playlist_id, video_id) DO NOTHING
        "#,
    )
    .bind(playlist_id)
    .bind(video_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Remove a video from a playlist. Removing an absent video is a no-op.
pub async fn remove_video<'e, E>(
    executor: E,
    playlist_id: i64,
    video_id: i64,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query("DELETE FROM playlist_videos WHERE playlist_id = $1 AND video_id = $2")
        .bind(playlist_id)
        .bind(video_id)
        .execute(executor)
        .await?;
    Ok(())
}

// ============================================================================
// List pipelines
// ============================================================================

/// Summary row for a user's playlists with the computed video count.
#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSummaryRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub total_videos: i64,
}

/// Playlists owned by a user, newest first, with `total_videos` computed as
/// the size of the membership set.
pub fn user_playlists_pipeline(user_id: i64) -> Pipeline {
    Pipeline::select(
        "playlists p",
        &["p.id", "p.name", "p.description", "p.created_at", "p.updated_at"],
    )
    .computed(Computed::Count {
        table: "playlist_videos",
        fk: "playlist_id",
        key: "p.id",
        alias: "total_videos",
    })
    .filter(Predicate::Eq {
        column: "p.owner_id",
        value: Bind::BigInt(user_id),
    })
    .sort("p.created_at", SortDir::Desc)
}

/// Row for a playlist's contents: video summary plus its owner's details.
#[derive(Debug, sqlx::FromRow)]
pub struct PlaylistVideoRow {
    pub video_id: i64,
    pub title: String,
    pub thumbnail: String,
    pub duration: f64,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub owner_id: i64,
    pub owner_username: String,
    pub owner_full_name: String,
    pub owner_avatar: String,
}

/// Videos of one playlist in playlist order, each with its owner joined.
pub fn playlist_videos_pipeline(playlist_id: i64) -> Pipeline {
    Pipeline::select(
        "playlist_videos pv",
        &[
            "v.id AS video_id",
            "v.title",
            "v.thumbnail",
            "v.duration",
            "v.views",
            "v.created_at",
            "u.id AS owner_id",
            "u.username AS owner_username",
            "u.full_name AS owner_full_name",
            "u.avatar AS owner_avatar",
        ],
    )
    .join("videos", "v", "v.id = pv.video_id")
    .join("users", "u", "u.id = v.owner_id")
    .filter(Predicate::Eq {
        column: "pv.playlist_id",
        value: Bind::BigInt(playlist_id),
    })
    .sort("pv.position", SortDir::Asc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql_of(pipeline: &Pipeline) -> String {
        let mut qb = sqlx::QueryBuilder::new("");
        pipeline.push_page_sql(&mut qb);
        qb.into_sql()
    }

    #[test]
    fn test_user_playlists_computes_total_videos() {
        let sql = sql_of(&user_playlists_pipeline(2));
        assert!(sql.contains(
            "(SELECT COUNT(*) FROM playlist_videos WHERE playlist_videos.playlist_id = p.id) AS total_videos"
        ));
        assert!(sql.contains("p.owner_id = $1"));
        assert!(sql.ends_with("ORDER BY p.created_at DESC"));
    }

    #[test]
    fn test_playlist_videos_keep_playlist_order() {
        let sql = sql_of(&playlist_videos_pipeline(2));
        assert!(sql.ends_with("ORDER BY pv.position ASC"));
        assert!(sql.contains("JOIN users u ON u.id = v.owner_id"));
    }
}
