// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account operation routes: registration, session lifecycle, profile
//! mutation, and the channel/watch-history aggregations.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{
        multipart::{Field, MultipartError},
        Multipart, Path, State,
    },
    http::StatusCode,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::error::{AppError, Result};
use crate::middleware::auth::{
    AuthUser, MaybeAuthUser, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE,
};
use crate::models::{
    user::hash_password, ChannelProfile, PublicUser, User, VideoOwner, WatchHistoryVideo,
};
use crate::response::ApiResponse;
use crate::time_utils;
use crate::AppState;

/// Routes that need no authentication.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/users/register", post(register))
        .route("/api/v1/users/login", post(login))
        .route("/api/v1/users/refresh-token", post(refresh_access_token))
}

/// Routes behind the access-token check (applied in routes/mod.rs).
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/users/logout", post(logout))
        .route("/api/v1/users/change-password", patch(change_password))
        .route("/api/v1/users/current-user", get(current_user))
        .route("/api/v1/users/update-account", patch(update_account))
        .route("/api/v1/users/update-avatar", patch(update_avatar))
        .route(
            "/api/v1/users/update-cover-image",
            patch(update_cover_image),
        )
        .route("/api/v1/users/watch-history", get(watch_history))
}

/// Channel lookup: public, but an attached identity drives `isSubscribed`.
pub fn channel_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/v1/users/channel/{username}", get(channel_profile))
}

// ─── Cookies ─────────────────────────────────────────────────

fn auth_cookie(name: &'static str, value: &str, max_age_secs: u64) -> Cookie<'static> {
    Cookie::build((name, value.to_string()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(max_age_secs as i64))
        .build()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::ZERO)
        .build()
}

fn token_cookies(jar: CookieJar, pair: &crate::services::TokenPair, state: &AppState) -> CookieJar {
    jar.add(auth_cookie(
        ACCESS_TOKEN_COOKIE,
        &pair.access_token,
        state.tokens.access_expiry(),
    ))
    .add(auth_cookie(
        REFRESH_TOKEN_COOKIE,
        &pair.refresh_token,
        state.tokens.refresh_expiry(),
    ))
}

// ─── Multipart helpers ───────────────────────────────────────

struct UploadedFile {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

fn bad_multipart(err: MultipartError) -> AppError {
    AppError::BadRequest(format!("Invalid multipart body: {}", err))
}

async fn read_text(field: Field<'_>) -> Result<String> {
    field.text().await.map_err(bad_multipart)
}

async fn read_file(field: Field<'_>) -> Result<UploadedFile> {
    let file_name = field.file_name().unwrap_or("upload").to_string();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let bytes = field.bytes().await.map_err(bad_multipart)?.to_vec();

    Ok(UploadedFile {
        file_name,
        content_type,
        bytes,
    })
}

/// Scan a multipart body for a single file part with the given name.
async fn read_single_file(
    multipart: &mut Multipart,
    name: &str,
) -> Result<Option<UploadedFile>> {
    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        if field.name() == Some(name) {
            return Ok(Some(read_file(field).await?));
        }
    }
    Ok(None)
}

fn required_field(value: Option<String>, name: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("{} is required", name)))
}

// ─── Register ────────────────────────────────────────────────

/// Register a new account from a multipart form: the four text fields
/// plus a required avatar file and an optional cover image.
async fn register(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl axum::response::IntoResponse> {
    let mut full_name = None;
    let mut email = None;
    let mut username = None;
    let mut password = None;
    let mut avatar_file = None;
    let mut cover_file = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        // Own the name up front; reading the field consumes it
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "fullName" => full_name = Some(read_text(field).await?),
            "email" => email = Some(read_text(field).await?),
            "username" => username = Some(read_text(field).await?),
            "password" => password = Some(read_text(field).await?),
            "avatar" => avatar_file = Some(read_file(field).await?),
            "coverImage" => cover_file = Some(read_file(field).await?),
            _ => {}
        }
    }

    // All validation happens before any side effect
    let full_name = required_field(full_name, "fullName")?;
    let email = required_field(email, "email")?;
    let username = required_field(username, "username")?.to_lowercase();
    let password = required_field(password, "password")?;
    let avatar_file =
        avatar_file.ok_or_else(|| AppError::BadRequest("Avatar file is required".to_string()))?;

    if state.db.get_user_by_username(&username).await?.is_some()
        || state.db.get_user_by_email(&email).await?.is_some()
    {
        return Err(AppError::Conflict(
            "User with this email or username already exists".to_string(),
        ));
    }

    // The required upload happens before the record exists; a failure
    // here leaves no partial state behind.
    let avatar = state
        .media
        .upload(
            &avatar_file.file_name,
            &avatar_file.content_type,
            avatar_file.bytes,
        )
        .await?;

    let cover_image = match cover_file {
        Some(file) => Some(
            state
                .media
                .upload(&file.file_name, &file.content_type, file.bytes)
                .await?,
        ),
        None => None,
    };

    let now = time_utils::now_rfc3339();
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        username,
        email,
        full_name,
        password_hash: hash_password(&password)?,
        avatar: avatar.into(),
        cover_image: cover_image.map(Into::into),
        refresh_token: None,
        watch_history: vec![],
        created_at: now.clone(),
        updated_at: now,
    };

    state.db.create_user(&user).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok(ApiResponse::new(
        StatusCode::CREATED,
        PublicUser::from(&user),
        "User registered successfully",
    ))
}

// ─── Login / Logout / Refresh ────────────────────────────────

#[derive(Deserialize)]
struct LoginRequest {
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginData {
    user: PublicUser,
    access_token: String,
    refresh_token: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<impl axum::response::IntoResponse> {
    let username = payload
        .username
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let email = payload
        .email
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    if username.is_none() && email.is_none() {
        return Err(AppError::BadRequest(
            "username or email is required".to_string(),
        ));
    }
    let password = required_field(payload.password.clone(), "password")?;

    let mut user = None;
    if let Some(username) = username {
        user = state
            .db
            .get_user_by_username(&username.to_lowercase())
            .await?;
    }
    if user.is_none() {
        if let Some(email) = email {
            user = state.db.get_user_by_email(email).await?;
        }
    }
    let user = user.ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

    if !user.verify_password(&password)? {
        return Err(AppError::Unauthorized(
            "Invalid user credentials".to_string(),
        ));
    }

    let pair = state.tokens.issue_token_pair(&state.db, &user).await?;
    let jar = token_cookies(jar, &pair, &state);

    tracing::info!(user_id = %user.id, "User logged in");

    Ok((
        jar,
        ApiResponse::ok(
            LoginData {
                user: PublicUser::from(&user),
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
            "User logged in successfully",
        ),
    ))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<impl axum::response::IntoResponse> {
    // Clear the stored refresh token first; the cookies only go away
    // once the server-side session is actually revoked.
    if let Some(mut user) = state.db.get_user(&identity.user_id).await? {
        user.refresh_token = None;
        user.updated_at = time_utils::now_rfc3339();
        state.db.set_refresh_token(&user).await?;
    }

    let jar = jar
        .add(removal_cookie(ACCESS_TOKEN_COOKIE))
        .add(removal_cookie(REFRESH_TOKEN_COOKIE));

    tracing::info!(user_id = %identity.user_id, "User logged out");

    Ok((jar, ApiResponse::ok(serde_json::json!({}), "User logged out")))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenData {
    access_token: String,
    refresh_token: String,
}

/// Rotate a refresh token: verify the signature, then require an exact
/// match with the value stored on the user record. Rotation overwrites
/// that value, so a replayed token fails the comparison.
async fn refresh_access_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> Result<impl axum::response::IntoResponse> {
    let presented = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .or_else(|| body.and_then(|Json(b)| b.refresh_token))
        .ok_or_else(|| AppError::Unauthorized("Refresh token is required".to_string()))?;

    let claims = state.tokens.verify_refresh_token(&presented)?;

    let user = state
        .db
        .get_user(&claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".to_string()))?;

    if user.refresh_token.as_deref() != Some(presented.as_str()) {
        return Err(AppError::Unauthorized(
            "Refresh token is expired or already used".to_string(),
        ));
    }

    let pair = state.tokens.issue_token_pair(&state.db, &user).await?;
    let jar = token_cookies(jar, &pair, &state);

    Ok((
        jar,
        ApiResponse::ok(
            TokenData {
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
            "Access token refreshed successfully",
        ),
    ))
}

// ─── Password / Profile ──────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    old_password: Option<String>,
    new_password: Option<String>,
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl axum::response::IntoResponse> {
    let old_password = required_field(payload.old_password, "oldPassword")?;
    let new_password = required_field(payload.new_password, "newPassword")?;

    let mut user = state
        .db
        .get_user(&identity.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !user.verify_password(&old_password)? {
        return Err(AppError::Unauthorized(
            "Old password is incorrect".to_string(),
        ));
    }

    user.password_hash = hash_password(&new_password)?;
    // Revoke the outstanding session along with the old credential
    user.refresh_token = None;
    user.updated_at = time_utils::now_rfc3339();
    state.db.set_password(&user).await?;

    tracing::info!(user_id = %user.id, "Password changed");

    Ok(ApiResponse::ok(
        serde_json::json!({}),
        "Password changed successfully",
    ))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CurrentUserData {
    id: String,
    username: String,
    email: String,
    full_name: String,
}

/// Answered entirely from access-token claims; no store round-trip.
async fn current_user(
    Extension(identity): Extension<AuthUser>,
) -> Result<impl axum::response::IntoResponse> {
    Ok(ApiResponse::ok(
        CurrentUserData {
            id: identity.user_id,
            username: identity.username,
            email: identity.email,
            full_name: identity.full_name,
        },
        "Current user fetched successfully",
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateAccountRequest {
    full_name: Option<String>,
    email: Option<String>,
}

async fn update_account(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthUser>,
    Json(payload): Json<UpdateAccountRequest>,
) -> Result<impl axum::response::IntoResponse> {
    let full_name = required_field(payload.full_name, "fullName")?;
    let email = required_field(payload.email, "email")?;

    let mut user = state
        .db
        .get_user(&identity.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    user.full_name = full_name;
    user.email = email;
    user.updated_at = time_utils::now_rfc3339();
    state.db.set_account_details(&user).await?;

    Ok(ApiResponse::ok(
        PublicUser::from(&user),
        "Account details updated successfully",
    ))
}

// ─── Media updates ───────────────────────────────────────────

async fn update_avatar(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<impl axum::response::IntoResponse> {
    let file = read_single_file(&mut multipart, "avatar")
        .await?
        .ok_or_else(|| AppError::BadRequest("Avatar file is required".to_string()))?;

    let mut user = state
        .db
        .get_user(&identity.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let uploaded = state
        .media
        .upload(&file.file_name, &file.content_type, file.bytes)
        .await?;

    let old_public_id = user.avatar.public_id.clone();
    user.avatar = uploaded.into();
    user.updated_at = time_utils::now_rfc3339();
    state.db.set_avatar(&user).await?;

    // Best-effort cleanup: the new asset is already committed
    if let Err(e) = state.media.destroy(&old_public_id).await {
        tracing::warn!(error = %e, public_id = %old_public_id, "Failed to delete replaced avatar");
    }

    Ok(ApiResponse::ok(
        PublicUser::from(&user),
        "Avatar updated successfully",
    ))
}

async fn update_cover_image(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<impl axum::response::IntoResponse> {
    let file = read_single_file(&mut multipart, "coverImage")
        .await?
        .ok_or_else(|| AppError::BadRequest("Cover image file is required".to_string()))?;

    let mut user = state
        .db
        .get_user(&identity.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let uploaded = state
        .media
        .upload(&file.file_name, &file.content_type, file.bytes)
        .await?;

    let old_public_id = user.cover_image.as_ref().map(|c| c.public_id.clone());
    user.cover_image = Some(uploaded.into());
    user.updated_at = time_utils::now_rfc3339();
    state.db.set_cover_image(&user).await?;

    if let Some(old_public_id) = old_public_id {
        if let Err(e) = state.media.destroy(&old_public_id).await {
            tracing::warn!(error = %e, public_id = %old_public_id, "Failed to delete replaced cover image");
        }
    }

    Ok(ApiResponse::ok(
        PublicUser::from(&user),
        "Cover image updated successfully",
    ))
}

// ─── Aggregations ────────────────────────────────────────────

async fn channel_profile(
    State(state): State<Arc<AppState>>,
    Extension(MaybeAuthUser(viewer)): Extension<MaybeAuthUser>,
    Path(username): Path<String>,
) -> Result<impl axum::response::IntoResponse> {
    let username = username.trim().to_lowercase();
    if username.is_empty() {
        return Err(AppError::BadRequest("username is missing".to_string()));
    }

    let user = state
        .db
        .get_user_by_username(&username)
        .await?
        .ok_or_else(|| AppError::NotFound("Channel not found".to_string()))?;

    let subscribers = state.db.subscribers_of(&user.id).await?;
    let subscribed_to = state.db.subscriptions_of(&user.id).await?;

    let is_subscribed = viewer
        .map(|v| subscribers.iter().any(|s| s.subscriber_id == v.user_id))
        .unwrap_or(false);

    let profile = ChannelProfile {
        full_name: user.full_name,
        username: user.username,
        subscribers_count: subscribers.len() as u64,
        channel_subscribed_to_count: subscribed_to.len() as u64,
        is_subscribed,
        avatar: user.avatar,
        cover_image: user.cover_image,
        email: user.email,
    };

    Ok(ApiResponse::ok(profile, "User channel fetched successfully"))
}

/// Watch history with each video's owner embedded as a single object.
/// An empty history is an empty list, not an error.
async fn watch_history(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthUser>,
) -> Result<impl axum::response::IntoResponse> {
    let user = state
        .db
        .get_user(&identity.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let videos = state.db.get_videos(&user.watch_history).await?;

    // Resolve each distinct owner once
    let mut owner_ids: Vec<String> = videos.iter().map(|v| v.owner_id.clone()).collect();
    owner_ids.sort();
    owner_ids.dedup();

    let owners: HashMap<String, VideoOwner> = state
        .db
        .get_users_by_ids(&owner_ids)
        .await?
        .iter()
        .map(|owner| (owner.id.clone(), VideoOwner::from(owner)))
        .collect();

    let history: Vec<WatchHistoryVideo> = videos
        .into_iter()
        .filter_map(|video| {
            owners
                .get(&video.owner_id)
                .cloned()
                .map(|owner| WatchHistoryVideo::new(video, owner))
        })
        .collect();

    Ok(ApiResponse::ok(
        history,
        "Watch history fetched successfully",
    ))
}
