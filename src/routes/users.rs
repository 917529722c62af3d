// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User account routes: registration, sessions, profile updates.

use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    routing::{get, patch, post},
    Extension, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::config::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{ChannelProfile, UserView, WatchHistoryEntry};
use crate::response::{ApiResponse, Empty};
use crate::routes::extract::ValidJson;
use crate::services::{ProfileImage, Registration, TokenPair};
use crate::uploads::{read_multipart, MultipartForm};
use crate::AppState;

/// Routes open to anonymous callers.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", post(register))
        .route("/users/login", post(login))
        .route("/users/refresh-token", post(refresh_token))
}

/// Routes that use the caller's identity when one is present.
pub fn optional_auth_routes() -> Router<Arc<AppState>> {
    Router::new().route("/users/channel/{username}", get(channel_profile))
}

/// Routes that require authentication.
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/logout", post(logout))
        .route("/users/current-user", get(current_user))
        .route("/users/change-password", patch(change_password))
        .route("/users/update-account", patch(update_account))
        .route("/users/avatar", patch(update_avatar))
        .route("/users/cover-image", patch(update_cover_image))
        .route("/users/history", get(watch_history))
}

// ─── Cookies ─────────────────────────────────────────────────

fn session_cookie(
    name: &'static str,
    value: String,
    max_age_secs: i64,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

fn with_session_cookies(jar: CookieJar, state: &AppState, pair: &TokenPair) -> CookieJar {
    let secure = state.config.cookie_secure;
    let tokens = state.auth.tokens();

    jar.add(session_cookie(
        ACCESS_TOKEN_COOKIE,
        pair.access_token.clone(),
        tokens.access_ttl_secs() as i64,
        secure,
    ))
    .add(session_cookie(
        REFRESH_TOKEN_COOKIE,
        pair.refresh_token.clone(),
        tokens.refresh_ttl_secs() as i64,
        secure,
    ))
}

/// Expire both session cookies, whether or not the request carried them.
fn without_session_cookies(jar: CookieJar, state: &AppState) -> CookieJar {
    let secure = state.config.cookie_secure;

    jar.add(session_cookie(ACCESS_TOKEN_COOKIE, String::new(), 0, secure))
        .add(session_cookie(REFRESH_TOKEN_COOKIE, String::new(), 0, secure))
}

// ─── Registration ────────────────────────────────────────────

async fn staged_form(
    state: &AppState,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<MultipartForm> {
    let multipart = multipart.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    read_multipart(multipart, &state.config.upload_dir).await
}

/// Register a new user from a multipart form.
async fn register(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<UserView>> {
    let mut form = staged_form(&state, multipart).await?;

    let registration = Registration {
        fullname: form.take_text("fullname"),
        email: form.take_text("email"),
        username: form.take_text("username"),
        password: form.take_text("password"),
        avatar: form.take_file("avatar"),
        cover_image: form.take_file("coverImage"),
    };

    let user = state.profiles.register(registration).await?;

    Ok(ApiResponse::created(
        UserView::from(user),
        "User registered successfully",
    ))
}

// ─── Sessions ────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "password is required"))]
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: UserView,
    pub access_token: String,
    pub refresh_token: String,
}

/// Log in with username or email and password.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ValidJson(body): ValidJson<LoginRequest>,
) -> Result<(CookieJar, ApiResponse<LoginResponse>)> {
    let (user, pair) = state
        .auth
        .login(body.username.as_deref(), body.email.as_deref(), &body.password)
        .await?;

    let jar = with_session_cookies(jar, &state, &pair);

    Ok((
        jar,
        ApiResponse::ok(
            LoginResponse {
                user: UserView::from(user),
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
            "User logged in successfully",
        ),
    ))
}

/// Revoke the stored refresh token and clear the session cookies.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<Empty>)> {
    state.auth.logout(&user.user_id).await?;

    Ok((
        without_session_cookies(jar, &state),
        ApiResponse::ok(Empty {}, "User logged out"),
    ))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Rotate the token pair. The cookie wins over the body.
async fn refresh_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, ApiResponse<TokenPair>)> {
    let incoming = match jar.get(REFRESH_TOKEN_COOKIE) {
        Some(cookie) if !cookie.value().is_empty() => Some(cookie.value().to_string()),
        _ if body.is_empty() => None,
        _ => serde_json::from_slice::<RefreshRequest>(&body)
            .unwrap_or_default()
            .refresh_token,
    };

    let (_, pair) = state.auth.refresh(incoming.as_deref()).await?;
    let jar = with_session_cookies(jar, &state, &pair);

    Ok((jar, ApiResponse::ok(pair, "Access token refreshed")))
}

// ─── Profile ─────────────────────────────────────────────────

/// Get the authenticated user.
async fn current_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<ApiResponse<UserView>> {
    let user = state.profiles.current_user(&user.user_id).await?;
    Ok(ApiResponse::ok(
        UserView::from(user),
        "Current user fetched successfully",
    ))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    old_password: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "newPassword is required"))]
    new_password: String,
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ValidJson(body): ValidJson<ChangePasswordRequest>,
) -> Result<ApiResponse<Empty>> {
    state
        .profiles
        .change_password(&user.user_id, &body.old_password, &body.new_password)
        .await?;

    Ok(ApiResponse::ok(Empty {}, "Password changed successfully"))
}

#[derive(Deserialize, Validate)]
pub struct UpdateAccountRequest {
    #[serde(default)]
    #[validate(length(max = 100))]
    fullname: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

async fn update_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ValidJson(body): ValidJson<UpdateAccountRequest>,
) -> Result<ApiResponse<UserView>> {
    let updated = state
        .profiles
        .update_account(&user.user_id, body.fullname, body.email)
        .await?;

    Ok(ApiResponse::ok(
        UserView::from(updated),
        "Account details updated",
    ))
}

async fn update_image(
    state: &AppState,
    user: &AuthUser,
    kind: ProfileImage,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<UserView> {
    let mut form = staged_form(state, multipart).await?;
    let upload = form.take_file(kind.form_field());

    let updated = state
        .profiles
        .update_image(&user.user_id, kind, upload)
        .await?;
    Ok(UserView::from(updated))
}

async fn update_avatar(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<UserView>> {
    let view = update_image(&state, &user, ProfileImage::Avatar, multipart).await?;
    Ok(ApiResponse::ok(view, "Avatar image updated successfully"))
}

async fn update_cover_image(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<UserView>> {
    let view = update_image(&state, &user, ProfileImage::CoverImage, multipart).await?;
    Ok(ApiResponse::ok(view, "Cover image updated successfully"))
}

// ─── Channel Views ───────────────────────────────────────────

async fn channel_profile(
    State(state): State<Arc<AppState>>,
    viewer: Option<Extension<AuthUser>>,
    Path(username): Path<String>,
) -> Result<ApiResponse<ChannelProfile>> {
    let viewer_id = viewer.as_ref().map(|Extension(v)| v.user_id.as_str());

    let profile = state
        .channels
        .channel_profile(&username, viewer_id)
        .await?;

    Ok(ApiResponse::ok(profile, "User channel fetched successfully"))
}

async fn watch_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<ApiResponse<Vec<WatchHistoryEntry>>> {
    let history = state.channels.watch_history(&user.user_id).await?;
    Ok(ApiResponse::ok(
        history,
        "Watch history fetched successfully",
    ))
}
