// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Channel views and subscription edges.
//!
//! The channel profile is two joins against `subscriptions` (edges into the
//! channel, edges out of it) plus counts. Watch history joins the user's
//! watched IDs against `videos` and then against `users` for owners.

use std::collections::{HashMap, HashSet};

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::user::normalize_username;
use crate::models::{ChannelProfile, OwnerSummary, Subscription, WatchHistoryEntry};
use crate::time_utils::now_rfc3339;

/// Channel service.
#[derive(Clone)]
pub struct ChannelService {
    db: FirestoreDb,
}

impl ChannelService {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    /// Build the public profile of `username` as seen by `viewer_id`.
    pub async fn channel_profile(
        &self,
        username: &str,
        viewer_id: Option<&str>,
    ) -> Result<ChannelProfile> {
        let username = normalize_username(username);
        if username.is_empty() {
            return Err(AppError::BadRequest("username is missing".to_string()));
        }

        let channel = self
            .db
            .find_user_by_username(&username)
            .await?
            .ok_or_else(|| AppError::NotFound("Channel does not exist".to_string()))?;

        let (subscribers, subscribed_to) = tokio::try_join!(
            self.db.subscriptions_for_channel(&channel.id),
            self.db.subscriptions_by_subscriber(&channel.id),
        )?;

        let is_subscribed = viewer_id
            .is_some_and(|viewer| subscribers.iter().any(|edge| edge.subscriber == viewer));

        tracing::debug!(
            channel_id = %channel.id,
            subscribers = subscribers.len(),
            subscribed_to = subscribed_to.len(),
            is_subscribed,
            "Channel profile aggregated"
        );

        Ok(ChannelProfile {
            id: channel.id,
            fullname: channel.fullname,
            username: channel.username,
            email: channel.email,
            avatar: channel.avatar,
            cover_image: channel.cover_image,
            subscribers_count: subscribers.len() as u64,
            channels_subscribed_to_count: subscribed_to.len() as u64,
            is_subscribed,
        })
    }

    /// Watched videos of `user_id`, in watch order, with owner summaries.
    pub async fn watch_history(&self, user_id: &str) -> Result<Vec<WatchHistoryEntry>> {
        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid access token".to_string()))?;

        let videos = self.db.get_videos(&user.watch_history).await?;

        let mut seen = HashSet::new();
        let owner_ids: Vec<String> = videos
            .iter()
            .filter(|v| seen.insert(v.owner.clone()))
            .map(|v| v.owner.clone())
            .collect();

        let owners: HashMap<String, OwnerSummary> = self
            .db
            .get_users(&owner_ids)
            .await?
            .iter()
            .map(|owner| (owner.id.clone(), OwnerSummary::from(owner)))
            .collect();

        Ok(videos
            .into_iter()
            .map(|video| {
                let owner = owners.get(&video.owner).cloned();
                WatchHistoryEntry::new(video, owner)
            })
            .collect())
    }

    /// Follow `channel_id`, or unfollow if already following.
    ///
    /// Returns whether the subscriber follows the channel afterwards.
    pub async fn toggle_subscription(&self, subscriber_id: &str, channel_id: &str) -> Result<bool> {
        if subscriber_id == channel_id {
            return Err(AppError::BadRequest(
                "Cannot subscribe to your own channel".to_string(),
            ));
        }

        if self.db.get_user(channel_id).await?.is_none() {
            return Err(AppError::NotFound("Channel does not exist".to_string()));
        }

        if self
            .db
            .get_subscription(subscriber_id, channel_id)
            .await?
            .is_some()
        {
            self.db.delete_subscription(subscriber_id, channel_id).await?;
            tracing::info!(subscriber_id, channel_id, "Unsubscribed");
            return Ok(false);
        }

        self.db
            .set_subscription(&Subscription {
                subscriber: subscriber_id.to_string(),
                channel: channel_id.to_string(),
                created_at: now_rfc3339(),
            })
            .await?;

        tracing::info!(subscriber_id, channel_id, "Subscribed");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{User, Video};

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            username: id.to_string(),
            email: format!("{}@example.com", id),
            fullname: format!("User {}", id),
            password_hash: String::new(),
            avatar: format!("https://media.test/{}.png", id),
            cover_image: None,
            refresh_token: None,
            watch_history: vec![],
            created_at: now_rfc3339(),
            updated_at: now_rfc3339(),
        }
    }

    fn video(id: &str, owner: &str) -> Video {
        Video {
            id: id.to_string(),
            title: format!("Video {}", id),
            description: String::new(),
            thumbnail: String::new(),
            video_file: String::new(),
            duration: 60.0,
            views: 0,
            is_published: true,
            owner: owner.to_string(),
            created_at: now_rfc3339(),
        }
    }

    #[tokio::test]
    async fn test_toggle_subscription_flips() {
        let db = FirestoreDb::new_in_memory();
        db.insert_user(&user("a")).await.unwrap();
        db.insert_user(&user("b")).await.unwrap();
        let service = ChannelService::new(db.clone());

        assert!(service.toggle_subscription("a", "b").await.unwrap());
        assert_eq!(db.subscriptions_for_channel("b").await.unwrap().len(), 1);

        assert!(!service.toggle_subscription("a", "b").await.unwrap());
        assert!(db.subscriptions_for_channel("b").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_subscription_rejects_self_and_unknown() {
        let db = FirestoreDb::new_in_memory();
        db.insert_user(&user("a")).await.unwrap();
        let service = ChannelService::new(db);

        assert!(matches!(
            service.toggle_subscription("a", "a").await.unwrap_err(),
            AppError::BadRequest(_)
        ));
        assert!(matches!(
            service.toggle_subscription("a", "ghost").await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_watch_history_keeps_order_and_skips_missing() {
        let db = FirestoreDb::new_in_memory();
        let mut viewer = user("viewer");
        viewer.watch_history = vec!["v2".to_string(), "gone".to_string(), "v1".to_string()];
        db.insert_user(&viewer).await.unwrap();
        db.insert_user(&user("owner")).await.unwrap();
        db.set_video(&video("v1", "owner")).await.unwrap();
        db.set_video(&video("v2", "deleted-owner")).await.unwrap();

        let history = ChannelService::new(db).watch_history("viewer").await.unwrap();

        let ids: Vec<&str> = history.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["v2", "v1"]);
        assert!(history[0].owner.is_none());
        assert_eq!(history[1].owner.as_ref().unwrap().username, "owner");
    }

    #[tokio::test]
    async fn test_blank_username_is_bad_request() {
        let service = ChannelService::new(FirestoreDb::new_in_memory());
        assert!(matches!(
            service.channel_profile("  ", None).await.unwrap_err(),
            AppError::BadRequest(_)
        ));
    }
}
