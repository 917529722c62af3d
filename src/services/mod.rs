// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth;
pub mod channel;
pub mod media;
pub mod password;
pub mod profile;
pub mod tokens;

pub use auth::AuthService;
pub use channel::ChannelService;
pub use media::MediaService;
pub use profile::{ProfileImage, ProfileService, Registration};
pub use tokens::{TokenPair, TokenService};
