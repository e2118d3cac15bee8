//! Session management: JWT access and refresh tokens.
//!
//! Both tokens are HS256 JWTs signed with separate secrets. The refresh
//! token is additionally persisted on the user row and compared on refresh,
//! so a token is single-use: rotation swaps the stored value atomically and
//! a concurrent reuse of the old token loses the race and is rejected.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::error::ApiError;

/// JWT claims for both token kinds
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id as string
    pub exp: i64,    // expiry timestamp
    pub iat: i64,    // issued at
}

#[derive(Debug)]
pub enum SessionError {
    InvalidToken,
    Expired,
    DatabaseError(String),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::InvalidToken => write!(f, "Invalid token"),
            SessionError::Expired => write!(f, "Token expired"),
            SessionError::DatabaseError(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidToken => ApiError::Unauthorized("invalid token"),
            SessionError::Expired => ApiError::Unauthorized("token expired"),
            SessionError::DatabaseError(e) => ApiError::Internal(e),
        }
    }
}

const ACCESS_TOKEN_EXPIRY_MINUTES: i64 = 10;
const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 30;

fn create_token(user_id: i64, secret: &[u8], ttl: Duration) -> Result<String, SessionError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (now + ttl).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|_| SessionError::InvalidToken)
}

/// Create a JWT access token valid for 10 minutes
pub fn create_access_token(user_id: i64, secret: &[u8]) -> Result<String, SessionError> {
    create_token(user_id, secret, Duration::minutes(ACCESS_TOKEN_EXPIRY_MINUTES))
}

/// Create a JWT refresh token valid for 30 days
pub fn create_refresh_token(user_id: i64, secret: &[u8]) -> Result<String, SessionError> {
    create_token(user_id, secret, Duration::days(REFRESH_TOKEN_EXPIRY_DAYS))
}

/// Validate a token and return the user_id it names
pub fn validate_token(token: &str, secret: &[u8]) -> Result<i64, SessionError> {
    // Explicitly validate with HS256 only to prevent algorithm confusion
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_required_spec_claims(&["exp", "sub", "iat"]);

    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => SessionError::Expired,
            _ => SessionError::InvalidToken,
        })?;

    token_data
        .claims
        .sub
        .parse::<i64>()
        .map_err(|_| SessionError::InvalidToken)
}

/// Issue a fresh access/refresh pair and store the refresh token on the user
/// row (login and post-rotation paths both come through here).
pub async fn issue_session(
    db: &PgPool,
    user_id: i64,
    access_secret: &[u8],
    refresh_secret: &[u8],
) -> Result<(String, String), SessionError> {
    let access_token = create_access_token(user_id, access_secret)?;
    let refresh_token = create_refresh_token(user_id, refresh_secret)?;

    sqlx::query("UPDATE users SET refresh_token = $1, updated_at = NOW() WHERE id = $2")
        .bind(&refresh_token)
        .bind(user_id)
        .execute(db)
        .await
        .map_err(|e| SessionError::DatabaseError(e.to_string()))?;

    Ok((access_token, refresh_token))
}

/// Rotate a refresh token: validate the incoming JWT, then swap the stored
/// value in a single conditional UPDATE. If two requests race on the same
/// token, only one matches the stored value and succeeds.
/// Returns (user_id, access_token, refresh_token).
pub async fn rotate_refresh_token(
    db: &PgPool,
    incoming: &str,
    access_secret: &[u8],
    refresh_secret: &[u8],
) -> Result<(i64, String, String), SessionError> {
    let user_id = validate_token(incoming, refresh_secret)?;

    let new_refresh = create_refresh_token(user_id, refresh_secret)?;

    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        UPDATE users
        SET refresh_token = $1, updated_at = NOW()
        WHERE id = $2 AND refresh_token = $3
        RETURNING id
        "#,
    )
    .bind(&new_refresh)
    .bind(user_id)
    .bind(incoming)
    .fetch_optional(db)
    .await
    .map_err(|e| SessionError::DatabaseError(e.to_string()))?;

    // No match: the token was already rotated, revoked, or never issued
    row.ok_or(SessionError::InvalidToken)?;

    let access_token = create_access_token(user_id, access_secret)?;
    Ok((user_id, access_token, new_refresh))
}

/// Drop the stored refresh token (logout)
pub async fn clear_refresh_token(db: &PgPool, user_id: i64) -> Result<(), SessionError> {
    sqlx::query("UPDATE users SET refresh_token = NULL, updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .execute(db)
        .await
        .map_err(|e| SessionError::DatabaseError(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";
    const OTHER: &[u8] = b"other-secret";

    #[test]
    fn test_access_token_round_trip() {
        let token = create_access_token(42, SECRET).unwrap();
        assert_eq!(validate_token(&token, SECRET).unwrap(), 42);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_access_token(42, SECRET).unwrap();
        assert!(matches!(
            validate_token(&token, OTHER),
            Err(SessionError::InvalidToken)
        ));
    }

    #[test]
    fn test_refresh_token_not_valid_as_access_token() {
        // Separate secrets keep the two token kinds from being swapped.
        let refresh = create_refresh_token(42, OTHER).unwrap();
        assert!(validate_token(&refresh, SECRET).is_err());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let token = create_access_token(42, SECRET).unwrap();
        let mut tampered = token.clone();
        tampered.pop();
        assert!(validate_token(&tampered, SECRET).is_err());
    }
}
