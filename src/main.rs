// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Vidtube Accounts API Server
//!
//! User registration, cookie sessions with rotating refresh tokens, profile
//! images on a media host, channel profiles and watch history.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vidtube_accounts::{
    config::{Config, DatabaseMode},
    db::FirestoreDb,
    services::MediaService,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Vidtube Accounts API");

    let db = match config.database_mode {
        DatabaseMode::Firestore => FirestoreDb::new(&config.gcp_project_id).await?,
        DatabaseMode::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            FirestoreDb::new_in_memory()
        }
    };

    let media = media_service(&config)?;

    // Staging directory for multipart uploads
    tokio::fs::create_dir_all(&config.upload_dir).await?;
    tracing::info!(path = %config.upload_dir.display(), "Upload staging directory ready");

    let port = config.port;
    let state = Arc::new(AppState::new(config, db, media));

    // Build router
    let app = vidtube_accounts::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Pick the media backend: Cloudinary when configured, the mock in debug builds.
fn media_service(config: &Config) -> Result<MediaService, Box<dyn std::error::Error>> {
    if let Some(cloudinary) = &config.cloudinary {
        tracing::info!(cloud = %cloudinary.cloud_name, "Cloudinary media host configured");
        return Ok(MediaService::new(cloudinary));
    }

    #[cfg(debug_assertions)]
    {
        tracing::warn!("CLOUDINARY_* not set; using mock media host");
        Ok(MediaService::new_mock())
    }

    #[cfg(not(debug_assertions))]
    {
        Err("CLOUDINARY_CLOUD_NAME, CLOUDINARY_API_KEY and CLOUDINARY_API_SECRET are required".into())
    }
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vidtube_accounts=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
