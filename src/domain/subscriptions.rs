//! Subscription domain - toggle writes and subscriber/channel listings
//!
//! A subscription row's existence means "subscriber follows channel". The
//! toggle uses the same single-statement conditional write as likes.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};

/// Toggle a subscription. Returns true when the subscription now exists.
pub async fn toggle<'e, E>(
    executor: E,
    subscriber_id: i64,
    channel_id: i64,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        WITH removed AS (
            DELETE FROM subscriptions
            WHERE subscriber_id = $1 AND channel_id = $2
            RETURNING id
        )
        INSERT INTO subscriptions (subscriber_id, channel_id)
        SELECT $1, $2 WHERE NOT EXISTS (SELECT 1 FROM removed)
        "#,
    )
    .bind(subscriber_id)
    .bind(channel_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// A subscriber or subscribed channel, projected to the public summary set.
#[derive(Debug, sqlx::FromRow)]
pub struct SubscriptionEntry {
    pub since: DateTime<Utc>,
    pub user_id: i64,
    pub username: String,
    pub full_name: String,
    pub avatar: String,
}

/// Users subscribed to a channel.
pub async fn subscribers_of<'e, E>(
    executor: E,
    channel_id: i64,
) -> Result<Vec<SubscriptionEntry>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT s.created_at AS since, u.id AS user_id, u.username, u.full_name, u.avatar
        FROM subscriptions s
        JOIN users u ON u.id = s.subscriber_id
        WHERE s.channel_id = $1
        ORDER BY s.created_at DESC
        "#,
    )
    .bind(channel_id)
    .fetch_all(executor)
    .await
}

pub async fn count_subscribers<'e, E>(executor: E, channel_id: i64) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM subscriptions WHERE channel_id = $1")
            .bind(channel_id)
            .fetch_one(executor)
            .await?;
    Ok(count)
}

/// Channels a user is subscribed to.
pub async fn channels_of<'e, E>(
    executor: E,
    subscriber_id: i64,
) -> Result<Vec<SubscriptionEntry>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT s.created_at AS since, u.id AS user_id, u.username, u.full_name, u.avatar
        FROM subscriptions s
        JOIN users u ON u.id = s.channel_id
        WHERE s.subscriber_id = $1
        ORDER BY s.created_at DESC
        "#,
    )
    .bind(subscriber_id)
    .fetch_all(executor)
    .await
}

pub async fn count_subscriptions<'e, E>(
    executor: E,
    subscriber_id: i64,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = $1")
            .bind(subscriber_id)
            .fetch_one(executor)
            .await?;
    Ok(count)
}
