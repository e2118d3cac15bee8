//! Video domain - DB queries and the feed pipeline
//!
//! All functions use the generic Executor pattern, allowing them to work with
//! both `&PgPool` and `&mut PgConnection` (transactions).

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Executor, Postgres};

use crate::query::{Bind, Pipeline, Predicate, owner_filter, sort_stage, text_filter};

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: i64,
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    pub description: String,
    pub duration: f64,
    pub owner_id: i64,
    pub is_published: bool,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub async fn create_video<'e, E>(
    executor: E,
    owner_id: i64,
    video_file: &str,
    thumbnail: &str,
    title: &str,
    description: &str,
    duration: f64,
) -> Result<Video, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        INSERT INTO videos (video_file, thumbnail, title, description, duration, owner_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(video_file)
    .bind(thumbnail)
    .bind(title)
    .bind(description)
    .bind(duration)
    .bind(owner_id)
    .fetch_one(executor)
    .await
}

/// Fetch a video regardless of publish state (owner operations).
pub async fn find_by_id<'e, E>(executor: E, video_id: i64) -> Result<Option<Video>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as("SELECT * FROM videos WHERE id = $1")
        .bind(video_id)
        .fetch_optional(executor)
        .await
}

/// Fetch a published video. An unpublished video is not found from the
/// viewer's perspective.
pub async fn find_published<'e, E>(
    executor: E,
    video_id: i64,
) -> Result<Option<Video>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as("SELECT * FROM videos WHERE id = $1 AND is_published = TRUE")
        .bind(video_id)
        .fetch_optional(executor)
        .await
}

/// Update title/description/thumbnail; absent fields keep their value.
/// Ownership is checked by the caller before this runs.
pub async fn update_details<'e, E>(
    executor: E,
    video_id: i64,
    title: Option<&str>,
    description: Option<&str>,
    thumbnail: Option<&str>,
) -> Result<Video, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        UPDATE videos
        SET title = COALESCE($2, title),
            description = COALESCE($3, description),
            thumbnail = COALESCE($4, thumbnail),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(video_id)
    .bind(title)
    .bind(description)
    .bind(thumbnail)
    .fetch_one(executor)
    .await
}

pub async fn delete_video<'e, E>(executor: E, video_id: i64) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query("DELETE FROM videos WHERE id = $1")
        .bind(video_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn toggle_publish<'e, E>(executor: E, video_id: i64) -> Result<Video, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        UPDATE videos
        SET is_published = NOT is_published, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(video_id)
    .fetch_one(executor)
    .await
}

pub async fn increment_views<'e, E>(executor: E, video_id: i64) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query("UPDATE videos SET views = views + 1 WHERE id = $1")
        .bind(video_id)
        .execute(executor)
        .await?;
    Ok(())
}

// ============================================================================
// Feed pipeline
// ============================================================================

/// Feed row: list-view projection of a video with its owner flattened in.
/// `video_file` is deliberately absent from list views. Serialization goes
/// through the route DTO, which nests the owner fields.
#[derive(Debug, sqlx::FromRow)]
pub struct VideoFeedRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub duration: f64,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub owner_id: i64,
    pub owner_username: String,
    pub owner_full_name: String,
    pub owner_avatar: String,
}

/// Free-text match set for the feed: title, description, owner username.
const FEED_TEXT_COLUMNS: &[&str] = &["v.title", "v.description", "u.username"];

/// Feed sort allow-list.
const FEED_SORT_FIELDS: &[(&str, &str)] = &[
    ("createdAt", "v.created_at"),
    ("views", "v.views"),
    ("duration", "v.duration"),
    ("title", "v.title"),
];

/// Assemble the published-video feed. Stage order is fixed: owner join,
/// projection, publish filter, owner filter, free-text filter, sort.
pub fn feed_pipeline(
    query: Option<&str>,
    sort_by: Option<&str>,
    sort_type: Option<&str>,
    user_id: Option<&str>,
) -> Pipeline {
    let (sort_column, sort_dir) = sort_stage(FEED_SORT_FIELDS, "v.created_at", sort_by, sort_type);
    Pipeline::select(
        "videos v",
        &[
            "v.id",
            "v.title",
            "v.description",
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
    .join("users", "u", "u.id = v.owner_id")
    .filter(Predicate::Eq {
        column: "v.is_published",
        value: Bind::Bool(true),
    })
    .filter_opt(owner_filter("u.id", user_id))
    .filter_opt(text_filter(FEED_TEXT_COLUMNS, query))
    .sort(sort_column, sort_dir)
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
    fn test_feed_defaults() {
        let sql = sql_of(&feed_pipeline(None, None, None, None));
        assert!(sql.contains("JOIN users u ON u.id = v.owner_id"));
        assert!(sql.contains("v.is_published = $1"));
        assert!(sql.ends_with("ORDER BY v.created_at DESC"));
        assert!(!sql.contains("ILIKE"));
    }

    #[test]
    fn test_feed_with_all_filters() {
        let sql = sql_of(&feed_pipeline(
            Some("ferris"),
            Some("views"),
            Some("asc"),
            Some("12"),
        ));
        assert!(sql.contains("u.id = $2"));
        assert!(sql.contains("v.title ILIKE"));
        assert!(sql.contains("u.username ILIKE"));
        assert!(sql.ends_with("ORDER BY v.views ASC"));
    }

    #[test]
    fn test_feed_ignores_malformed_owner() {
        let sql = sql_of(&feed_pipeline(None, None, None, Some("nope")));
        // Only the publish-state bind remains.
        assert!(!sql.contains("$2"));
    }

    #[test]
    fn test_feed_excludes_video_file_in_list_view() {
        let sql = sql_of(&feed_pipeline(None, None, None, None));
        assert!(!sql.contains("video_file"));
    }
}
