// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication middleware.

use crate::config::ACCESS_TOKEN_COOKIE;
use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Authenticated user extracted from the access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

/// Access token from the cookie, falling back to a bearer header.
/// An empty cookie (as left behind by logout) counts as absent.
fn extract_access_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(ACCESS_TOKEN_COOKIE).filter(|c| !c.value().is_empty()) {
        return Some(cookie.value().to_string());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn authenticate(state: &AppState, jar: &CookieJar, headers: &HeaderMap) -> Option<AuthUser> {
    let token = extract_access_token(jar, headers)?;

    match state.auth.tokens().verify_access_token(&token) {
        Ok(claims) => Some(AuthUser {
            user_id: claims.sub,
        }),
        Err(e) => {
            tracing::debug!(error = %e, "Rejected access token");
            None
        }
    }
}

/// Middleware that requires valid JWT authentication.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_user = authenticate(&state, &jar, request.headers())
        .ok_or_else(|| AppError::Unauthorized("Unauthorized request".to_string()))?;

    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Middleware that attaches the user when a valid token is present.
///
/// Requests without a token, or with an invalid one, pass through anonymously.
pub async fn optional_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(auth_user) = authenticate(&state, &jar, request.headers()) {
        request.extensions_mut().insert(auth_user);
    }

    next.run(request).await
}
