//! Comment domain - DB queries for video comments
//!
//! All functions use the generic Executor pattern, allowing them to work with
//! both `&PgPool` and `&mut PgConnection` (transactions).

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Executor, Postgres};

use crate::query::{Bind, Pipeline, Predicate, SortDir};

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub video_id: i64,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub async fn create_comment<'e, E>(
    executor: E,
    video_id: i64,
    owner_id: i64,
    content: &str,
) -> Result<Comment, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        "INSERT INTO comments (content, video_id, owner_id) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(content)
    .bind(video_id)
    .bind(owner_id)
    .fetch_one(executor)
    .await
}

pub async fn find_by_id<'e, E>(
    executor: E,
    comment_id: i64,
) -> Result<Option<Comment>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as("SELECT * FROM comments WHERE id = $1")
        .bind(comment_id)
        .fetch_optional(executor)
        .await
}

/// Replace a comment's content. Ownership is checked by the caller.
pub async fn update_content<'e, E>(
    executor: E,
    comment_id: i64,
    content: &str,
) -> Result<Comment, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        "UPDATE comments SET content = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(comment_id)
    .bind(content)
    .fetch_one(executor)
    .await
}

pub async fn delete_comment<'e, E>(executor: E, comment_id: i64) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(comment_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// List row for a video's comments with the projected owner subset.
#[derive(Debug, sqlx::FromRow)]
pub struct CommentFeedRow {
    pub id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner_id: i64,
    pub owner_username: String,
    pub owner_avatar: String,
}

/// Comments on one video, newest first, owner joined and projected down.
pub fn video_comments_pipeline(video_id: i64) -> Pipeline {
    Pipeline::select(
        "comments c",
        &[
            "c.id",
            "c.content",
            "c.created_at",
            "c.updated_at",
            "u.id AS owner_id",
            "u.username AS owner_username",
            "u.avatar AS owner_avatar",
        ],
    )
    .join("users", "u", "u.id = c.owner_id")
    .filter(Predicate::Eq {
        column: "c.video_id",
        value: Bind::BigInt(video_id),
    })
    .sort("c.created_at", SortDir::Desc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_comments_pipeline_shape() {
        let mut qb = sqlx::QueryBuilder::new("");
        video_comments_pipeline(8).push_page_sql(&mut qb);
        let sql = qb.into_sql();
        assert!(sql.contains("JOIN users u ON u.id = c.owner_id"));
        assert!(sql.contains("c.video_id = $1"));
        assert!(sql.ends_with("ORDER BY c.created_at DESC"));
        assert!(!sql.contains("u.email"));
    }
}
