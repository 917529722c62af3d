// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Refresh token rotation tests.
//!
//! Each refresh token is accepted exactly once: rotation replaces the stored
//! token, so presenting an older one fails even while its signature is valid.

use axum::http::StatusCode;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use serde_json::json;
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;
use vidtube_accounts::config::{Config, REFRESH_TOKEN_COOKIE};

mod common;
use common::{body_json, empty_request, find_cookie, json_request, set_cookie_headers};

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

/// Sign refresh-shaped claims with an arbitrary key.
fn forge_refresh_token(user_id: &str, key: &[u8], exp: usize) -> String {
    #[derive(Serialize)]
    struct Claims<'a> {
        sub: &'a str,
        jti: &'a str,
        exp: usize,
        iat: usize,
    }

    encode(
        &Header::new(Algorithm::HS256),
        &Claims {
            sub: user_id,
            jti: "forged",
            exp,
            iat: now(),
        },
        &EncodingKey::from_secret(key),
    )
    .unwrap()
}

#[tokio::test]
async fn test_refresh_from_cookie_rotates_tokens() {
    let (app, state) = common::create_test_app();
    let session = common::signup(&app, "alice").await;

    let response = app
        .oneshot(empty_request(
            "POST",
            "/users/refresh-token",
            Some(&format!("{REFRESH_TOKEN_COOKIE}={}", session.refresh_token)),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookie_headers(&response);
    find_cookie(&cookies, "accessToken");
    let refresh_cookie = find_cookie(&cookies, "refreshToken");

    let body = body_json(response).await;
    assert_eq!(body["message"], "Access token refreshed");
    let new_refresh = body["data"]["refreshToken"].as_str().unwrap();
    assert!(body["data"]["accessToken"].as_str().is_some());

    assert_ne!(new_refresh, session.refresh_token);
    assert!(refresh_cookie.starts_with(&format!("refreshToken={new_refresh}")));

    let stored = state.db.get_user(&session.user_id).await.unwrap().unwrap();
    assert_eq!(stored.refresh_token.as_deref(), Some(new_refresh));
}

#[tokio::test]
async fn test_refresh_from_body() {
    let (app, _) = common::create_test_app();
    let session = common::signup(&app, "alice").await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/users/refresh-token",
            &json!({ "refreshToken": session.refresh_token }),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refreshed_access_token_authenticates() {
    let (app, _) = common::create_test_app();
    let session = common::signup(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/users/refresh-token",
            &json!({ "refreshToken": session.refresh_token }),
            None,
        ))
        .await
        .unwrap();
    let data = body_json(response).await["data"].clone();
    let access = data["accessToken"].as_str().unwrap();

    let response = app
        .oneshot(empty_request(
            "GET",
            "/users/current-user",
            Some(&format!("accessToken={access}")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["username"], "alice");
}

#[tokio::test]
async fn test_reused_refresh_token_rejected() {
    let (app, _) = common::create_test_app();
    let session = common::signup(&app, "alice").await;
    let body = json!({ "refreshToken": session.refresh_token });

    let first = app
        .clone()
        .oneshot(json_request("POST", "/users/refresh-token", &body, None))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(json_request("POST", "/users/refresh-token", &body, None))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(second).await["message"],
        "Refresh token is expired or used"
    );
}

#[tokio::test]
async fn test_new_login_invalidates_previous_refresh_token() {
    let (app, _) = common::create_test_app();
    let first = common::signup(&app, "alice").await;
    let _second = common::login(&app, "alice", "password123").await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/users/refresh-token",
            &json!({ "refreshToken": first.refresh_token }),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_refresh_token_rejected() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(empty_request("POST", "/users/refresh-token", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["message"],
        "Unauthorized request"
    );
}

#[tokio::test]
async fn test_forged_refresh_token_rejected() {
    let (app, _) = common::create_test_app();
    let session = common::signup(&app, "alice").await;

    let forged = forge_refresh_token(
        &session.user_id,
        b"not-the-refresh-secret-at-all!!!",
        now() + 3600,
    );

    let response = app
        .oneshot(json_request(
            "POST",
            "/users/refresh-token",
            &json!({ "refreshToken": forged }),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_json(response).await["message"]
        .as_str()
        .unwrap()
        .starts_with("Invalid refresh token"));
}

#[tokio::test]
async fn test_access_token_not_accepted_as_refresh_token() {
    let (app, _) = common::create_test_app();
    let session = common::signup(&app, "alice").await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/users/refresh-token",
            &json!({ "refreshToken": session.access_token }),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_refresh_token_rejected() {
    let config = Config {
        upload_dir: common::test_upload_dir(),
        ..Config::test_default()
    };
    let secret = config.refresh_token_secret.clone();
    let (app, _) = common::create_test_app_with(config);
    let session = common::signup(&app, "alice").await;

    // Past the default 60s leeway
    let expired = forge_refresh_token(&session.user_id, &secret, now() - 3600);

    let response = app
        .oneshot(json_request(
            "POST",
            "/users/refresh-token",
            &json!({ "refreshToken": expired }),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_valid_token_for_unknown_user_rejected() {
    let config = Config {
        upload_dir: common::test_upload_dir(),
        ..Config::test_default()
    };
    let secret = config.refresh_token_secret.clone();
    let (app, _) = common::create_test_app_with(config);

    let token = forge_refresh_token("no-such-user", &secret, now() + 3600);

    let response = app
        .oneshot(json_request(
            "POST",
            "/users/refresh-token",
            &json!({ "refreshToken": token }),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["message"],
        "Invalid refresh token"
    );
}
