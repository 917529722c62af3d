// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower::ServiceExt;
use vidtube_accounts::config::Config;
use vidtube_accounts::db::FirestoreDb;
use vidtube_accounts::routes::create_router;
use vidtube_accounts::services::MediaService;
use vidtube_accounts::AppState;

const BOUNDARY: &str = "vidtube-test-boundary";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Fresh upload staging directory for one test.
#[allow(dead_code)]
pub fn test_upload_dir() -> PathBuf {
    std::env::temp_dir().join(format!("vidtube-test-{}", uuid::Uuid::new_v4()))
}

/// Create a test app over the in-memory store and the mock media host.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with(Config {
        upload_dir: test_upload_dir(),
        ..Config::test_default()
    })
}

/// Like [`create_test_app`], with a caller-supplied config.
#[allow(dead_code)]
pub fn create_test_app_with(config: Config) -> (axum::Router, Arc<AppState>) {
    create_test_app_with_media(config, MediaService::new_mock())
}

#[allow(dead_code)]
pub fn create_test_app_with_media(
    config: Config,
    media: MediaService,
) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config, FirestoreDb::new_in_memory(), media));
    (create_router(state.clone()), state)
}

/// Number of files left in the staging directory.
#[allow(dead_code)]
pub fn staged_file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.count())
        .unwrap_or(0)
}

/// One part of a multipart body.
#[allow(dead_code)]
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

/// Build a multipart/form-data request.
#[allow(dead_code)]
pub fn multipart_request(
    method: &str,
    uri: &str,
    parts: &[Part<'_>],
    cookie: Option<&str>,
) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, filename, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder().method(method).uri(uri).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={BOUNDARY}"),
    );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

/// Build a JSON request, optionally with a Cookie header.
#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: &Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Build a body-less request, optionally with a Cookie header.
#[allow(dead_code)]
pub fn empty_request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

#[allow(dead_code)]
pub fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

/// Cookie header carrying both session tokens.
#[allow(dead_code)]
pub fn session_cookie(access: &str, refresh: &str) -> String {
    format!("accessToken={access}; refreshToken={refresh}")
}

/// Register through the API and return the `data` object.
#[allow(dead_code)]
pub async fn register(app: &axum::Router, username: &str, email: &str, password: &str) -> Value {
    let request = multipart_request(
        "POST",
        "/users",
        &[
            Part::Text("fullname", &format!("{username} Fullname")),
            Part::Text("email", email),
            Part::Text("username", username),
            Part::Text("password", password),
            Part::File("avatar", "avatar.png", b"\x89PNG avatar"),
        ],
        None,
    );

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), 201, "registration of {username} failed");
    body_json(response).await["data"].clone()
}

/// Tokens handed out by a successful login.
#[allow(dead_code)]
pub struct Session {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: String,
}

impl Session {
    #[allow(dead_code)]
    pub fn cookie(&self) -> String {
        session_cookie(&self.access_token, &self.refresh_token)
    }
}

/// Log in by username and return the issued tokens.
#[allow(dead_code)]
pub async fn login(app: &axum::Router, username: &str, password: &str) -> Session {
    let request = json_request(
        "POST",
        "/users/login",
        &serde_json::json!({ "username": username, "password": password }),
        None,
    );

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), 200, "login of {username} failed");
    let data = body_json(response).await["data"].clone();

    Session {
        user_id: data["user"]["id"].as_str().unwrap().to_string(),
        access_token: data["accessToken"].as_str().unwrap().to_string(),
        refresh_token: data["refreshToken"].as_str().unwrap().to_string(),
    }
}

/// Register and log in.
#[allow(dead_code)]
pub async fn signup(app: &axum::Router, username: &str) -> Session {
    register(app, username, &format!("{username}@example.com"), "password123").await;
    login(app, username, "password123").await
}
