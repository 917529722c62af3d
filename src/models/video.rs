// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Video documents (read side only) and the watch-history projection.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use super::user::OwnerSummary;

/// Video document stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Video {
    /// Video ID (also used as document ID)
    pub id: String,
    pub title: String,
    pub description: String,
    /// Thumbnail URL
    pub thumbnail: String,
    /// Video file URL
    pub video_file: String,
    /// Duration in seconds
    pub duration: f64,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub is_published: bool,
    /// User ID of the uploader
    pub owner: String,
    pub created_at: String,
}

/// A watched video with its owner summarized.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WatchHistoryEntry {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub video_file: String,
    pub duration: f64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub views: u64,
    pub is_published: bool,
    pub created_at: String,
    pub owner: Option<OwnerSummary>,
}

impl WatchHistoryEntry {
    pub fn new(video: Video, owner: Option<OwnerSummary>) -> Self {
        Self {
            id: video.id,
            title: video.title,
            description: video.description,
            thumbnail: video.thumbnail,
            video_file: video.video_file,
            duration: video.duration,
            views: video.views,
            is_published: video.is_published,
            created_at: video.created_at,
            owner,
        }
    }
}
