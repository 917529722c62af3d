// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Channel profile: a user viewed as the target of subscriptions.

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Public channel page, with relationship counts relative to the viewer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ChannelProfile {
    pub id: String,
    pub fullname: String,
    pub username: String,
    pub email: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    /// Number of users following this channel
    pub subscribers_count: u64,
    /// Number of channels this user follows
    pub channels_subscribed_to_count: u64,
    /// Whether the requesting user follows this channel
    pub is_subscribed: bool,
}
