//! Like domain - toggle writes and the liked-videos view
//!
//! A like references exactly one of video/comment/tweet. Toggling is a
//! single conditional statement (delete-if-exists-else-insert), so two
//! concurrent toggles from the same user cannot double-insert; the partial
//! unique indexes back this up at the schema level.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};

use crate::query::{Bind, Pipeline, Predicate, SortDir};

/// Target column for a like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeTarget {
    Video,
    Comment,
    Tweet,
}

impl LikeTarget {
    fn column(self) -> &'static str {
        match self {
            LikeTarget::Video => "video_id",
            LikeTarget::Comment => "comment_id",
            LikeTarget::Tweet => "tweet_id",
        }
    }
}

fn toggle_sql(target: LikeTarget) -> String {
    let column = target.column();
    format!(
        "WITH removed AS (DELETE FROM likes WHERE {column} = $1 AND liked_by = $2 RETURNING id) \
         INSERT INTO likes ({column}, liked_by) \
         SELECT $1, $2 WHERE NOT EXISTS (SELECT 1 FROM removed)"
    )
}

/// Toggle a like. Returns true when the like now exists (inserted), false
/// when it was removed.
pub async fn toggle<'e, E>(
    executor: E,
    target: LikeTarget,
    target_id: i64,
    user_id: i64,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(&toggle_sql(target))
        .bind(target_id)
        .bind(user_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// List row for the caller's liked videos: the like's timestamp plus the
/// video and its owner, projected down per the liked-videos view.
#[derive(Debug, sqlx::FromRow)]
pub struct LikedVideoRow {
    pub liked_at: DateTime<Utc>,
    pub video_id: i64,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub duration: f64,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub owner_username: String,
    pub owner_avatar: String,
}

/// Videos the user has liked, most recently liked first.
pub fn liked_videos_pipeline(user_id: i64) -> Pipeline {
    Pipeline::select(
        "likes l",
        &[
            "l.created_at AS liked_at",
            "v.id AS video_id",
            "v.title",
            "v.description",
            "v.thumbnail",
            "v.duration",
            "v.views",
            "v.created_at",
            "u.username AS owner_username",
            "u.avatar AS owner_avatar",
        ],
    )
    .join("videos", "v", "v.id = l.video_id")
    .join("users", "u", "u.id = v.owner_id")
    .filter(Predicate::Eq {
        column: "l.liked_by",
        value: Bind::BigInt(user_id),
    })
    .filter(Predicate::NotNull {
        column: "l.video_id",
    })
    .sort("l.created_at", SortDir::Desc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_sql_is_one_statement() {
        let sql = toggle_sql(LikeTarget::Video);
        assert!(sql.starts_with("WITH removed AS (DELETE FROM likes"));
        assert!(sql.contains("WHERE video_id = $1 AND liked_by = $2"));
        assert!(sql.contains("INSERT INTO likes (video_id, liked_by)"));
        assert!(sql.contains("WHERE NOT EXISTS (SELECT 1 FROM removed)"));
    }

    #[test]
    fn test_toggle_sql_per_target() {
        assert!(toggle_sql(LikeTarget::Comment).contains("comment_id = $1"));
        assert!(toggle_sql(LikeTarget::Tweet).contains("tweet_id = $1"));
    }

    #[test]
    fn test_liked_videos_pipeline_shape() {
        let mut qb = sqlx::QueryBuilder::new("");
        liked_videos_pipeline(4).push_page_sql(&mut qb);
        let sql = qb.into_sql();
        let video_join = sql.find("JOIN videos v ON v.id = l.video_id").unwrap();
        let owner_join = sql.find("JOIN users u ON u.id = v.owner_id").unwrap();
        assert!(video_join < owner_join);
        assert!(sql.contains("l.liked_by = $1"));
        assert!(sql.contains("l.video_id IS NOT NULL"));
        assert!(sql.ends_with("ORDER BY l.created_at DESC"));
        // Owner is projected down to username/avatar only.
        assert!(!sql.contains("u.email"));
        assert!(!sql.contains("u.full_name"));
    }
}
