// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Token secrets and media host credentials are read once at startup and
//! kept in memory for the lifetime of the process.

use std::env;
use std::path::PathBuf;

/// Name of the cookie carrying the access token.
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
/// Name of the cookie carrying the refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

const DEFAULT_ACCESS_TOKEN_EXPIRY_SECS: u64 = 24 * 60 * 60;
const DEFAULT_REFRESH_TOKEN_EXPIRY_SECS: u64 = 10 * 24 * 60 * 60;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Which document store backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseMode {
    /// Google Firestore (or the emulator when `FIRESTORE_EMULATOR_HOST` is set).
    Firestore,
    /// In-process store, lost on restart.
    Memory,
}

/// Cloudinary credentials for the media host.
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Document store backend
    pub database_mode: DatabaseMode,
    /// Directory where multipart file parts are staged before upload
    pub upload_dir: PathBuf,
    /// Maximum accepted request body size
    pub max_upload_bytes: usize,
    /// Whether auth cookies carry the `Secure` attribute
    pub cookie_secure: bool,
    /// Access token lifetime
    pub access_token_expiry_secs: u64,
    /// Refresh token lifetime
    pub refresh_token_expiry_secs: u64,

    // --- Secrets ---
    /// HS256 key for access tokens (raw bytes)
    pub access_token_secret: Vec<u8>,
    /// HS256 key for refresh tokens (raw bytes)
    pub refresh_token_secret: Vec<u8>,
    /// Media host credentials; `None` selects the mock uploader in debug builds
    pub cloudinary: Option<CloudinaryConfig>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            database_mode: DatabaseMode::Memory,
            upload_dir: env::temp_dir().join("vidtube-accounts-uploads"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            cookie_secure: true,
            access_token_expiry_secs: DEFAULT_ACCESS_TOKEN_EXPIRY_SECS,
            refresh_token_expiry_secs: DEFAULT_REFRESH_TOKEN_EXPIRY_SECS,
            access_token_secret: b"test_access_key_32_bytes_minimum!".to_vec(),
            refresh_token_secret: b"test_refresh_key_32_bytes_minimum".to_vec(),
            cloudinary: None,
        }
    }
}

impl Config {
    /// Config used by the test suites.
    pub fn test_default() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let database_mode = match env::var("DATABASE_MODE")
            .unwrap_or_else(|_| "firestore".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "firestore" => DatabaseMode::Firestore,
            "memory" => DatabaseMode::Memory,
            _ => return Err(ConfigError::Invalid("DATABASE_MODE")),
        };

        let cloudinary = match (
            env::var("CLOUDINARY_CLOUD_NAME"),
            env::var("CLOUDINARY_API_KEY"),
            env::var("CLOUDINARY_API_SECRET"),
        ) {
            (Ok(cloud_name), Ok(api_key), Ok(api_secret)) => Some(CloudinaryConfig {
                cloud_name: cloud_name.trim().to_string(),
                api_key: api_key.trim().to_string(),
                api_secret: api_secret.trim().to_string(),
            }),
            _ => None,
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            database_mode,
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./public/temp")),
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            cookie_secure: env::var("COOKIE_SECURE")
                .map(|v| v.trim() != "false" && v.trim() != "0")
                .unwrap_or(true),
            access_token_expiry_secs: parse_or(
                "ACCESS_TOKEN_EXPIRY_SECS",
                DEFAULT_ACCESS_TOKEN_EXPIRY_SECS,
            )?,
            refresh_token_expiry_secs: parse_or(
                "REFRESH_TOKEN_EXPIRY_SECS",
                DEFAULT_REFRESH_TOKEN_EXPIRY_SECS,
            )?,
            access_token_secret: env::var("ACCESS_TOKEN_SECRET")
                .map_err(|_| ConfigError::Missing("ACCESS_TOKEN_SECRET"))?
                .into_bytes(),
            refresh_token_secret: env::var("REFRESH_TOKEN_SECRET")
                .map_err(|_| ConfigError::Missing("REFRESH_TOKEN_SECRET"))?
                .into_bytes(),
            cloudinary,
        })
    }
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
