//! Authentication and session management endpoints (/users/*)

use axum::{
    Json, Router,
    extract::{FromRequestParts, Multipart, State},
    http::{StatusCode, header::AUTHORIZATION, header::SET_COOKIE, request::Parts},
    response::{IntoResponse, Response},
    routing::post,
};
use axum_extra::extract::CookieJar;
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};

use super::{bad_multipart, read_media_field, required_text};
use crate::AppState;
use crate::constants::MIN_USERNAME_LENGTH;
use crate::domain::users::{self, PublicUser};
use crate::services::{cookies, error::ApiError, password, session};
use crate::storage::media_path;

pub fn routes() -> Router<Arc<AppState>> {
    // Rate limit: allow a burst of 10 requests, then 1 every ~6 seconds, to
    // keep credential stuffing off the login and register endpoints
    let rate_limit_config = GovernorConfigBuilder::default()
        .per_second(6)
        .burst_size(10)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .expect("Failed to build rate limit config");

    let rate_limit_layer = GovernorLayer {
        config: rate_limit_config.into(),
    };

    Router::new()
        .route("/users/register", post(register_user))
        .route("/users/login", post(login_user))
        .route("/users/logout", post(logout_user))
        .route("/users/refresh-token", post(refresh_token))
        .route("/users/change-password", post(change_password))
        .layer(rate_limit_layer)
}

// ============================================================================
// Auth Extractor - validates the access token and extracts the user_id
// ============================================================================

/// Extractor that validates the accessToken cookie (or Authorization bearer
/// header) and returns the user_id
pub struct AuthUser(pub i64);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::Internal("cookie extraction failed".to_string()))?;

        let token = jar
            .get(cookies::config::ACCESS_TOKEN_NAME)
            .map(|c| c.value().to_string())
            .or_else(|| {
                parts
                    .headers
                    .get(AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.strip_prefix("Bearer "))
                    .map(str::to_string)
            })
            .ok_or(ApiError::Unauthorized("unauthorized request"))?;

        let user_id = session::validate_token(&token, &state.access_secret)?;
        Ok(AuthUser(user_id))
    }
}

// ============================================================================
// Registration
// ============================================================================

/// POST /users/register - multipart: fullName, username, email, password,
/// avatar (required image), coverImage (optional image)
async fn register_user(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    let mut full_name = None;
    let mut username = None;
    let mut email = None;
    let mut plain_password = None;
    let mut avatar: Option<(String, Bytes)> = None;
    let mut cover_image: Option<(String, Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "fullName" => full_name = Some(field.text().await.map_err(bad_multipart)?),
            "username" => username = Some(field.text().await.map_err(bad_multipart)?),
            "email" => email = Some(field.text().await.map_err(bad_multipart)?),
            "password" => plain_password = Some(field.text().await.map_err(bad_multipart)?),
            "avatar" => avatar = Some(read_media_field(field, "image/", "avatar").await?),
            "coverImage" => {
                cover_image = Some(read_media_field(field, "image/", "coverImage").await?);
            }
            _ => {}
        }
    }

    let full_name = required_text(full_name, "fullName")?;
    let username = required_text(username, "username")?;
    let email = required_text(email, "email")?;
    let plain_password = required_text(plain_password, "password")?;

    if username.chars().count() < MIN_USERNAME_LENGTH {
        return Err(ApiError::InvalidArgument(format!(
            "username must be at least {MIN_USERNAME_LENGTH} characters long"
        )));
    }
    if username != username.to_lowercase() {
        return Err(ApiError::InvalidArgument(
            "username must be lowercase".to_string(),
        ));
    }
    if !email.contains('@') {
        return Err(ApiError::InvalidArgument("email is invalid".to_string()));
    }
    let (avatar_type, avatar_bytes) = avatar.ok_or_else(|| {
        ApiError::InvalidArgument("avatar image is required".to_string())
    })?;

    if users::find_by_username_or_email(&state.db, Some(username.as_str()), Some(email.as_str()))
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("user with email or username already exists"));
    }

    let avatar_url = state
        .storage
        .upload(
            &media_path("avatar", "signup", &avatar_type, Utc::now()),
            avatar_bytes,
        )
        .await?;
    let cover_url = match cover_image {
        Some((content_type, bytes)) => Some(
            state
                .storage
                .upload(
                    &media_path("cover", "signup", &content_type, Utc::now()),
                    bytes,
                )
                .await?,
        ),
        None => None,
    };

    let password_hash = password::hash_password(&plain_password)?;
    let user = users::create_user(
        &state.db,
        &username,
        &email,
        &full_name,
        &avatar_url,
        cover_url.as_deref(),
        &password_hash,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

// ============================================================================
// Session endpoints
// ============================================================================

#[derive(Deserialize)]
struct LoginRequest {
    username: Option<String>,
    email: Option<String>,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    user: PublicUser,
    access_token: String,
    refresh_token: String,
}

/// POST /users/login - username or email + password; sets session cookies
async fn login_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    if req.username.is_none() && req.email.is_none() {
        return Err(ApiError::InvalidArgument(
            "username or email is required".to_string(),
        ));
    }

    let user = users::find_by_username_or_email(
        &state.db,
        req.username.as_deref(),
        req.email.as_deref(),
    )
    .await?
    .ok_or(ApiError::NotFound("user"))?;

    if !password::verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::Unauthorized("invalid user credentials"));
    }

    let (access_token, refresh_token) = session::issue_session(
        &state.db,
        user.id,
        &state.access_secret,
        &state.refresh_secret,
    )
    .await?;

    let logged_in = users::get_public(&state.db, user.id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    let mut response = Json(LoginResponse {
        user: logged_in,
        access_token: access_token.clone(),
        refresh_token: refresh_token.clone(),
    })
    .into_response();
    response
        .headers_mut()
        .append(SET_COOKIE, cookies::build_access_cookie(&access_token)?);
    response
        .headers_mut()
        .append(SET_COOKIE, cookies::build_refresh_cookie(&refresh_token)?);

    Ok(response)
}

/// POST /users/logout - drop the stored refresh token and clear cookies
async fn logout_user(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Response, ApiError> {
    session::clear_refresh_token(&state.db, user_id).await?;

    let mut response = StatusCode::NO_CONTENT.into_response();
    response
        .headers_mut()
        .append(SET_COOKIE, cookies::build_clear_access_cookie());
    response
        .headers_mut()
        .append(SET_COOKIE, cookies::build_clear_refresh_cookie());

    Ok(response)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
    refresh_token: String,
}

/// POST /users/refresh-token - rotate the refresh token (cookie or body).
/// Each refresh token is single-use: the stored value is swapped atomically,
/// so a replayed token is rejected.
async fn refresh_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> Result<Response, ApiError> {
    let incoming = jar
        .get(cookies::config::REFRESH_TOKEN_NAME)
        .map(|c| c.value().to_string())
        .or_else(|| body.and_then(|Json(b)| b.refresh_token))
        .ok_or(ApiError::Unauthorized("unauthorized request"))?;

    let (_user_id, access_token, new_refresh_token) = session::rotate_refresh_token(
        &state.db,
        &incoming,
        &state.access_secret,
        &state.refresh_secret,
    )
    .await?;

    let mut response = Json(RefreshResponse {
        access_token: access_token.clone(),
        refresh_token: new_refresh_token.clone(),
    })
    .into_response();
    response
        .headers_mut()
        .append(SET_COOKIE, cookies::build_access_cookie(&access_token)?);
    response.headers_mut().append(
        SET_COOKIE,
        cookies::build_refresh_cookie(&new_refresh_token)?,
    );

    Ok(response)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    old_password: String,
    new_password: String,
}

/// POST /users/change-password
async fn change_password(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    if req.new_password.trim().is_empty() {
        return Err(ApiError::InvalidArgument(
            "new password is required".to_string(),
        ));
    }

    // A valid JWT for a deleted user is still unauthorized
    let user = users::find_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::Unauthorized("invalid access token"))?;

    if !password::verify_password(&req.old_password, &user.password_hash) {
        return Err(ApiError::InvalidArgument("invalid old password".to_string()));
    }

    let password_hash = password::hash_password(&req.new_password)?;
    users::update_password(&state.db, user_id, &password_hash).await?;

    Ok(StatusCode::NO_CONTENT)
}
