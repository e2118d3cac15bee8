//! User domain - DB queries for users, channel profiles, and watch history
//!
//! All functions use the generic Executor pattern, allowing them to work with
//! both `&PgPool` (for standalone queries) and `&mut PgConnection` (for
//! transactions). Profile and history views go through the pipeline
//! machinery because they join and compute against other tables.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Executor, PgPool, Postgres};

use crate::pagination;
use crate::query::{Bind, Computed, Pipeline, Predicate, SortDir};

/// Full user row, credentials included. Deliberately not `Serialize`:
/// responses go through `PublicUser` or route DTOs.
#[derive(Debug, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub password_hash: String,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public column set - everything except password_hash and refresh_token.
const PUBLIC_COLUMNS: &str =
    "id, username, email, full_name, avatar, cover_image, created_at, updated_at";

/// A user as returned to clients.
#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Look up a user by username or email (login and duplicate checks).
pub async fn find_by_username_or_email<'e, E>(
    executor: E,
    username: Option<&str>,
    email: Option<&str>,
) -> Result<Option<User>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as("SELECT * FROM users WHERE username = $1 OR email = $2")
        .bind(username.map(str::to_lowercase))
        .bind(email)
        .fetch_optional(executor)
        .await
}

pub async fn find_by_id<'e, E>(executor: E, user_id: i64) -> Result<Option<User>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await
}

pub async fn get_public<'e, E>(executor: E, user_id: i64) -> Result<Option<PublicUser>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(&format!("SELECT {PUBLIC_COLUMNS} FROM users WHERE id = $1"))
        .bind(user_id)
        .fetch_optional(executor)
        .await
}

pub async fn create_user<'e, E>(
    executor: E,
    username: &str,
    email: &str,
    full_name: &str,
    avatar: &str,
    cover_image: Option<&str>,
    password_hash: &str,
) -> Result<PublicUser, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(&format!(
        r#"
        INSERT INTO users (username, email, full_name, avatar, cover_image, password_hash)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {PUBLIC_COLUMNS}
        "#
    ))
    .bind(username.to_lowercase())
    .bind(email)
    .bind(full_name)
    .bind(avatar)
    .bind(cover_image)
    .bind(password_hash)
    .fetch_one(executor)
    .await
}

/// Update account details; absent fields keep their current value.
pub async fn update_account<'e, E>(
    executor: E,
    user_id: i64,
    full_name: Option<&str>,
    email: Option<&str>,
) -> Result<Option<PublicUser>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(&format!(
        r#"
        UPDATE users
        SET full_name = COALESCE($2, full_name),
            email = COALESCE($3, email),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {PUBLIC_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(full_name)
    .bind(email)
    .fetch_optional(executor)
    .await
}

pub async fn set_avatar<'e, E>(
    executor: E,
    user_id: i64,
    avatar: &str,
) -> Result<Option<PublicUser>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(&format!(
        "UPDATE users SET avatar = $2, updated_at = NOW() WHERE id = $1 RETURNING {PUBLIC_COLUMNS}"
    ))
    .bind(user_id)
    .bind(avatar)
    .fetch_optional(executor)
    .await
}

pub async fn set_cover_image<'e, E>(
    executor: E,
    user_id: i64,
    cover_image: &str,
) -> Result<Option<PublicUser>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(&format!(
        "UPDATE users SET cover_image = $2, updated_at = NOW() WHERE id = $1 RETURNING {PUBLIC_COLUMNS}"
    ))
    .bind(user_id)
    .bind(cover_image)
    .fetch_optional(executor)
    .await
}

pub async fn update_password<'e, E>(
    executor: E,
    user_id: i64,
    password_hash: &str,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .bind(password_hash)
        .execute(executor)
        .await?;
    Ok(())
}

// ============================================================================
// Channel profile
// ============================================================================

/// Channel profile view: public user fields enriched with subscription
/// counts and the viewer's own subscription state.
#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub subscribers_count: i64,
    pub channels_subscribed_to_count: i64,
    pub is_subscribed: bool,
}

fn channel_profile_pipeline(username: &str, viewer_id: Option<i64>) -> Pipeline {
    Pipeline::select(
        "users u",
        &[
            "u.id",
            "u.username",
            "u.email",
            "u.full_name",
            "u.avatar",
            "u.cover_image",
        ],
    )
    .computed(Computed::Count {
        table: "subscriptions",
        fk: "channel_id",
        key: "u.id",
        alias: "subscribers_count",
    })
    .computed(Computed::Count {
        table: "subscriptions",
        fk: "subscriber_id",
        key: "u.id",
        alias: "channels_subscribed_to_count",
    })
    .computed(Computed::ExistsEq {
        table: "subscriptions",
        fk: "channel_id",
        key: "u.id",
        col: "subscriber_id",
        value: viewer_id,
        alias: "is_subscribed",
    })
    .filter(Predicate::Eq {
        column: "u.username",
        value: Bind::Text(username.to_lowercase()),
    })
}

pub async fn channel_profile(
    db: &PgPool,
    username: &str,
    viewer_id: Option<i64>,
) -> Result<Option<ChannelProfile>, sqlx::Error> {
    pagination::fetch_optional(db, &channel_profile_pipeline(username, viewer_id)).await
}

// ============================================================================
// Watch history
// ============================================================================

/// One watch-history entry with the video's owner flattened in. The route
/// DTO nests the owner fields for the response.
#[derive(Debug, sqlx::FromRow)]
pub struct WatchHistoryEntry {
    pub watched_at: DateTime<Utc>,
    pub video_id: i64,
    pub title: String,
    pub thumbnail: String,
    pub duration: f64,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub owner_username: String,
    pub owner_full_name: String,
    pub owner_avatar: String,
}

fn watch_history_pipeline(user_id: i64) -> Pipeline {
    Pipeline::select(
        "watch_history wh",
        &[
            "wh.watched_at",
            "v.id AS video_id",
            "v.title",
            "v.thumbnail",
            "v.duration",
            "v.views",
            "v.created_at",
            "u.username AS owner_username",
            "u.full_name AS owner_full_name",
            "u.avatar AS owner_avatar",
        ],
    )
    .join("videos", "v", "v.id = wh.video_id")
    .join("users", "u", "u.id = v.owner_id")
    .filter(Predicate::Eq {
        column: "wh.user_id",
        value: Bind::BigInt(user_id),
    })
    .sort("wh.watched_at", SortDir::Desc)
}

pub async fn watch_history(
    db: &PgPool,
    user_id: i64,
) -> Result<Vec<WatchHistoryEntry>, sqlx::Error> {
    pagination::fetch_all(db, &watch_history_pipeline(user_id)).await
}

/// Record a view in the watch history. Re-watching moves the entry to the
/// front rather than duplicating it.
pub async fn record_watch<'e, E>(executor: E, user_id: i64, video_id: i64) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO watch_history (user_id, video_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, video_id) DO UPDATE SET watched_at = NOW()
        "#,
    )
    .bind(user_id)
    .bind(video_id)
    .execute(executor)
    .await?;
    Ok(())
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
    fn test_channel_profile_enrichment() {
        let sql = sql_of(&channel_profile_pipeline("Alice", Some(7)));
        assert!(sql.contains("AS subscribers_count"));
        assert!(sql.contains("AS channels_subscribed_to_count"));
        assert!(sql.contains("subscriptions.subscriber_id = $1) AS is_subscribed"));
        assert!(sql.contains("u.username = $2"));
        assert!(!sql.contains("password_hash"));
        assert!(!sql.contains("refresh_token"));
    }

    #[test]
    fn test_channel_profile_anonymous_viewer() {
        let sql = sql_of(&channel_profile_pipeline("alice", None));
        assert!(sql.contains("FALSE AS is_subscribed"));
    }

    #[test]
    fn test_watch_history_joins_video_then_owner() {
        let sql = sql_of(&watch_history_pipeline(3));
        let video_join = sql.find("JOIN videos v ON v.id = wh.video_id").unwrap();
        let owner_join = sql.find("JOIN users u ON u.id = v.owner_id").unwrap();
        assert!(video_join < owner_join);
        assert!(sql.contains("ORDER BY wh.watched_at DESC"));
    }
}
