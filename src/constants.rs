//! Application constants

/// GCS bucket name for uploaded media
pub const BUCKET_NAME: &str = "streamhub_media";

/// Maximum request body size for video publishes (200 MB)
pub const MAX_UPLOAD_SIZE: usize = 200 * 1024 * 1024;

/// Default page size for paginated list endpoints
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum length for tweet and comment content
pub const MAX_CONTENT_LENGTH: usize = 1000;

/// Maximum length for a playlist name
pub const MAX_PLAYLIST_NAME_LENGTH: usize = 100;

/// Maximum length for a playlist description
pub const MAX_PLAYLIST_DESCRIPTION_LENGTH: usize = 500;

/// Minimum length for a username at registration
pub const MIN_USERNAME_LENGTH: usize = 3;
