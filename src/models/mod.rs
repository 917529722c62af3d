// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod channel;
pub mod subscription;
pub mod user;
pub mod video;

pub use channel::ChannelProfile;
pub use subscription::Subscription;
pub use user::{OwnerSummary, User, UserView};
pub use video::{Video, WatchHistoryEntry};
