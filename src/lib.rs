// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Vidtube accounts: user registration, sessions and channel views
//!
//! This crate provides the backend API for user accounts of a video
//! sharing service, backed by Firestore and a media host.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod time_utils;
pub mod uploads;

use config::Config;
use db::FirestoreDb;
use services::{AuthService, ChannelService, MediaService, ProfileService, TokenService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub auth: AuthService,
    pub profiles: ProfileService,
    pub channels: ChannelService,
}

impl AppState {
    /// Wire the services over a database and media host.
    pub fn new(config: Config, db: FirestoreDb, media: MediaService) -> Self {
        let tokens = TokenService::new(&config);

        Self {
            auth: AuthService::new(db.clone(), tokens),
            profiles: ProfileService::new(db.clone(), media),
            channels: ChannelService::new(db.clone()),
            config,
            db,
        }
    }
}
