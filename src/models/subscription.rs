// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription edges between users.

use serde::{Deserialize, Serialize};

/// Directed edge: `subscriber` follows `channel`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subscription {
    /// User ID of the follower
    pub subscriber: String,
    /// User ID of the channel being followed
    pub channel: String,
    /// When the edge was created (ISO 8601)
    pub created_at: String,
}

impl Subscription {
    /// Document ID for an edge. One document per (subscriber, channel) pair.
    pub fn doc_id(subscriber: &str, channel: &str) -> String {
        format!("{}_{}", subscriber, channel)
    }
}
