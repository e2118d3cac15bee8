//! Tweet domain - DB queries for tweets
//!
//! All functions use the generic Executor pattern, allowing them to work with
//! both `&PgPool` and `&mut PgConnection` (transactions).

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Executor, Postgres};

use crate::query::{Bind, Pipeline, Predicate, SortDir};

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tweet {
    pub id: i64,
    pub content: String,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub async fn create_tweet<'e, E>(
    executor: E,
    owner_id: i64,
    content: &str,
) -> Result<Tweet, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as("INSERT INTO tweets (content, owner_id) VALUES ($1, $2) RETURNING *")
        .bind(content)
        .bind(owner_id)
        .fetch_one(executor)
        .await
}

pub async fn find_by_id<'e, E>(executor: E, tweet_id: i64) -> Result<Option<Tweet>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as("SELECT * FROM tweets WHERE id = $1")
        .bind(tweet_id)
        .fetch_optional(executor)
        .await
}

/// Replace a tweet's content. Ownership is checked by the caller.
pub async fn update_content<'e, E>(
    executor: E,
    tweet_id: i64,
    content: &str,
) -> Result<Tweet, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        "UPDATE tweets SET content = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(tweet_id)
    .bind(content)
    .fetch_one(executor)
    .await
}

pub async fn delete_tweet<'e, E>(executor: E, tweet_id: i64) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query("DELETE FROM tweets WHERE id = $1")
        .bind(tweet_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// List row for a user's tweets: tweet fields plus the projected owner
/// subset (id, username, avatar).
#[derive(Debug, sqlx::FromRow)]
pub struct TweetFeedRow {
    pub id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner_id: i64,
    pub owner_username: String,
    pub owner_avatar: String,
}

/// Tweets of one user, newest first, owner joined and projected down.
pub fn user_tweets_pipeline(user_id: i64) -> Pipeline {
    Pipeline::select(
        "tweets t",
        &[
            "t.id",
            "t.content",
            "t.created_at",
            "t.updated_at",
            "u.id AS owner_id",
            "u.username AS owner_username",
            "u.avatar AS owner_avatar",
        ],
    )
    .join("users", "u", "u.id = t.owner_id")
    .filter(Predicate::Eq {
        column: "u.id",
        value: Bind::BigInt(user_id),
    })
    .sort("t.created_at", SortDir::Desc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_tweets_pipeline_shape() {
        let mut qb = sqlx::QueryBuilder::new("");
        user_tweets_pipeline(5).push_page_sql(&mut qb);
        let sql = qb.into_sql();
        assert!(sql.contains("JOIN users u ON u.id = t.owner_id"));
        assert!(sql.contains("u.id = $1"));
        assert!(sql.ends_with("ORDER BY t.created_at DESC"));
        // Owner is projected down to id/username/avatar only.
        assert!(!sql.contains("u.email"));
        assert!(!sql.contains("u.full_name"));
        assert!(!sql.contains("password_hash"));
    }
}
