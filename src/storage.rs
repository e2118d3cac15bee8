//! Media storage: GCS or a local directory behind a single interface.
//!
//! Uploads return the public URL that gets stored on the resource
//! (`video_file`, `thumbnail`, `avatar`, `cover_image`). The URL is an opaque
//! string from then on; nothing here re-validates reachability.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use google_cloud_storage::client::Storage;
use std::path::PathBuf;

use crate::services::error::ApiError;

#[derive(Clone)]
pub enum MediaStorage {
    Gcs { client: Storage, bucket: String },
    Local { root: PathBuf, public_base: String },
}

impl MediaStorage {
    /// Upload `data` under `path` and return its public URL.
    pub async fn upload(&self, path: &str, data: Bytes) -> Result<String, ApiError> {
        match self {
            MediaStorage::Gcs { client, bucket } => {
                let bucket_name = format!("projects/_/buckets/{}", bucket);
                client
                    .write_object(&bucket_name, path, data)
                    .send_buffered()
                    .await
                    .map_err(|e| ApiError::Storage(e.to_string()))?;
                Ok(format!("https://storage.googleapis.com/{}/{}", bucket, path))
            }
            MediaStorage::Local { root, public_base } => {
                let full_path = root.join(path);
                if let Some(parent) = full_path.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| ApiError::Storage(e.to_string()))?;
                }
                tokio::fs::write(&full_path, &data)
                    .await
                    .map_err(|e| ApiError::Storage(e.to_string()))?;
                Ok(format!(
                    "{}/{}",
                    public_base.trim_end_matches('/'),
                    path
                ))
            }
        }
    }
}

/// Build the storage path for an upload. `scope` is `user_<id>` for
/// authenticated uploads and `signup` for registration, which runs before a
/// user id exists.
///
/// Path: video/user_123/2025-12-06/1733500000000.mp4
pub fn media_path(kind: &str, scope: &str, content_type: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}/{}/{}/{}.{}",
        kind,
        scope,
        now.format("%Y-%m-%d"),
        now.timestamp_millis(),
        extension_for(content_type)
    )
}

/// Storage scope for an authenticated user's uploads.
pub fn user_scope(user_id: i64) -> String {
    format!("user_{user_id}")
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_media_path_generation() {
        let now = Utc.with_ymd_and_hms(2025, 12, 6, 12, 0, 0).unwrap();
        assert_eq!(
            media_path("video", &user_scope(123), "video/mp4", now),
            format!("video/user_123/2025-12-06/{}.mp4", now.timestamp_millis())
        );
        assert_eq!(
            media_path("image", "signup", "image/png", now),
            format!("image/signup/2025-12-06/{}.png", now.timestamp_millis())
        );
    }

    #[test]
    fn test_extension_fallback() {
        assert_eq!(extension_for("application/octet-stream"), "bin");
        assert_eq!(extension_for("video/quicktime"), "mov");
    }
}
