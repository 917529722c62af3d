// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (identity, credentials, profile fields)
//! - Subscriptions (follower edges between users)
//! - Videos (read side, for watch history)
//!
//! The same API is served by an in-memory backend for tests and local runs.

use crate::db::memory::MemoryStore;
use crate::db::{collections, EMAIL_TAKEN, IDENTITY_TAKEN};
use crate::error::AppError;
use crate::models::user::{claim_doc_id, fields, IdentityClaim};
use crate::models::{Subscription, User, Video};
use firestore::FirestoreWritePrecondition;
use futures_util::{stream, StreamExt};
use std::sync::Arc;

const MAX_CONCURRENT_DB_OPS: usize = 16;

#[derive(Clone)]
enum Backend {
    Firestore(firestore::FirestoreDb),
    Memory(Arc<MemoryStore>),
    Offline,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    backend: Backend,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create an in-process store. Data lives as long as the process.
    pub fn new_in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(MemoryStore::default())),
        }
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self {
            backend: Backend::Offline,
        }
    }

    fn memory(&self) -> Option<&MemoryStore> {
        match &self.backend {
            Backend::Memory(store) => Some(store),
            _ => None,
        }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        match &self.backend {
            Backend::Firestore(client) => Ok(client),
            _ => Err(AppError::Database(
                "Database not connected (offline mode)".to_string(),
            )),
        }
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by document ID.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        if let Some(memory) = self.memory() {
            return Ok(memory.get_user(user_id));
        }

        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the user matching either identifier.
    ///
    /// Both values are compared as stored, so callers pass normalized input.
    /// Returns `None` when neither identifier is given.
    pub async fn find_user_by_identity(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, AppError> {
        if username.is_none() && email.is_none() {
            return Ok(None);
        }

        if let Some(memory) = self.memory() {
            return Ok(memory.find_user(username, email));
        }

        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(|q| {
                q.for_any([
                    username.and_then(|name| q.field(fields::USERNAME).eq(name)),
                    email.and_then(|mail| q.field(fields::EMAIL).eq(mail)),
                ])
            })
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().next())
    }

    /// Get a user by (normalized) username.
    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        self.find_user_by_identity(Some(username), None).await
    }

    /// Create a user document together with its username and email claims.
    ///
    /// The three writes commit in one transaction, each with a must-not-exist
    /// precondition. Fails with `Conflict` if either identity is already
    /// claimed or the ID is taken.
    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        if let Some(memory) = self.memory() {
            return memory.insert_user(user);
        }

        let client = self.get_client()?;
        let claim = IdentityClaim {
            user_id: user.id.clone(),
            created_at: user.created_at.clone(),
        };

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        for (collection, value) in [
            (collections::USERNAMES, &user.username),
            (collections::EMAILS, &user.email),
        ] {
            client
                .fluent()
                .update()
                .in_col(collection)
                .precondition(FirestoreWritePrecondition::Exists(false))
                .document_id(claim_doc_id(value))
                .object(&claim)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add claim to transaction: {}", e))
                })?;
        }

        client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(&user.id)
            .object(user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add user to transaction: {}", e)))?;

        if let Err(e) = transaction.commit().await {
            // Precondition failures are not a distinct error kind here.
            let taken = self.claim_exists(collections::USERNAMES, &user.username).await?
                || self.claim_exists(collections::EMAILS, &user.email).await?
                || self.get_user(&user.id).await?.is_some();
            if taken {
                return Err(AppError::Conflict(IDENTITY_TAKEN.to_string()));
            }
            return Err(AppError::Database(format!("Transaction commit failed: {}", e)));
        }

        Ok(())
    }

    /// Change a user's email: claim `user.email`, write the listed fields and
    /// release the claim on `previous_email`, all in one transaction.
    pub async fn update_user_email(
        &self,
        user: &User,
        previous_email: &str,
        field_paths: &[&str],
    ) -> Result<(), AppError> {
        if let Some(memory) = self.memory() {
            return memory.update_user_email(user, previous_email, field_paths);
        }
        if user.email == previous_email {
            return self.update_user_fields(user, field_paths).await;
        }

        let client = self.get_client()?;
        let claim = IdentityClaim {
            user_id: user.id.clone(),
            created_at: user.updated_at.clone(),
        };

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::EMAILS)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(claim_doc_id(&user.email))
            .object(&claim)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add claim to transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .fields(field_paths.iter().copied())
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add user to transaction: {}", e)))?;

        client
            .fluent()
            .delete()
            .from(collections::EMAILS)
            .document_id(claim_doc_id(previous_email))
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add claim release to transaction: {}", e))
            })?;

        if let Err(e) = transaction.commit().await {
            if self.claim_exists(collections::EMAILS, &user.email).await? {
                return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
            }
            return Err(AppError::Database(format!("Transaction commit failed: {}", e)));
        }

        Ok(())
    }

    async fn claim_exists(&self, collection: &str, value: &str) -> Result<bool, AppError> {
        let claim: Option<IdentityClaim> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(&claim_doc_id(value))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(claim.is_some())
    }

    /// Write only the listed fields of `user` to its document.
    ///
    /// Other fields keep whatever value is currently stored, so unrelated
    /// concurrent updates are not overwritten.
    pub async fn update_user_fields(
        &self,
        user: &User,
        field_paths: &[&str],
    ) -> Result<(), AppError> {
        if let Some(memory) = self.memory() {
            return memory.update_user_fields(user, field_paths);
        }

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(field_paths.iter().copied())
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Load several users, skipping IDs with no document.
    pub async fn get_users(&self, user_ids: &[String]) -> Result<Vec<User>, AppError> {
        let found = stream::iter(user_ids.to_vec())
            .map(|id| async move { self.get_user(&id).await })
            .buffered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Option<User>, AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<Option<User>>, AppError>>()?;

        Ok(found.into_iter().flatten().collect())
    }

    // ─── Video Operations ────────────────────────────────────────

    /// Get a video by ID.
    pub async fn get_video(&self, video_id: &str) -> Result<Option<Video>, AppError> {
        if let Some(memory) = self.memory() {
            return Ok(memory.get_video(video_id));
        }

        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::VIDEOS)
            .obj()
            .one(video_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Load videos in the given order, skipping IDs with no document.
    pub async fn get_videos(&self, video_ids: &[String]) -> Result<Vec<Video>, AppError> {
        let found = stream::iter(video_ids.to_vec())
            .map(|id| async move { self.get_video(&id).await })
            .buffered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Option<Video>, AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<Option<Video>>, AppError>>()?;

        Ok(found.into_iter().flatten().collect())
    }

    /// Store a video document.
    pub async fn set_video(&self, video: &Video) -> Result<(), AppError> {
        if let Some(memory) = self.memory() {
            memory.set_video(video);
            return Ok(());
        }

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::VIDEOS)
            .document_id(&video.id)
            .object(video)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Subscription Operations ─────────────────────────────────

    /// Get the edge `subscriber -> channel`, if any.
    pub async fn get_subscription(
        &self,
        subscriber: &str,
        channel: &str,
    ) -> Result<Option<Subscription>, AppError> {
        if let Some(memory) = self.memory() {
            return Ok(memory.get_subscription(subscriber, channel));
        }

        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::SUBSCRIPTIONS)
            .obj()
            .one(&Subscription::doc_id(subscriber, channel))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store an edge. Writing the same pair twice leaves a single document.
    pub async fn set_subscription(&self, subscription: &Subscription) -> Result<(), AppError> {
        if let Some(memory) = self.memory() {
            memory.set_subscription(subscription);
            return Ok(());
        }

        let doc_id = Subscription::doc_id(&subscription.subscriber, &subscription.channel);
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::SUBSCRIPTIONS)
            .document_id(&doc_id)
            .object(subscription)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete the edge `subscriber -> channel`.
    pub async fn delete_subscription(&self, subscriber: &str, channel: &str) -> Result<(), AppError> {
        if let Some(memory) = self.memory() {
            memory.delete_subscription(subscriber, channel);
            return Ok(());
        }

        self.get_client()?
            .fluent()
            .delete()
            .from(collections::SUBSCRIPTIONS)
            .document_id(Subscription::doc_id(subscriber, channel))
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// All edges pointing at `channel_id` (its subscribers).
    pub async fn subscriptions_for_channel(
        &self,
        channel_id: &str,
    ) -> Result<Vec<Subscription>, AppError> {
        self.subscriptions_where("channel", channel_id).await
    }

    /// All edges leaving `subscriber_id` (channels it follows).
    pub async fn subscriptions_by_subscriber(
        &self,
        subscriber_id: &str,
    ) -> Result<Vec<Subscription>, AppError> {
        self.subscriptions_where("subscriber", subscriber_id).await
    }

    async fn subscriptions_where(
        &self,
        field: &'static str,
        user_id: &str,
    ) -> Result<Vec<Subscription>, AppError> {
        if let Some(memory) = self.memory() {
            return Ok(memory.subscriptions_where(|s| match field {
                "channel" => s.channel == user_id,
                _ => s.subscriber == user_id,
            }));
        }

        self.get_client()?
            .fluent()
            .select()
            .from(collections::SUBSCRIPTIONS)
            .filter(|q| q.for_all([q.field(field).eq(user_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(id: &str) -> Video {
        Video {
            id: id.to_string(),
            title: format!("Video {id}"),
            description: String::new(),
            thumbnail: "https://media/thumb.png".to_string(),
            video_file: "https://media/video.mp4".to_string(),
            duration: 1.0,
            views: 0,
            is_published: true,
            owner: "owner".to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[tokio::test]
    async fn test_batch_get_runs_on_spawned_task() {
        let db = FirestoreDb::new_in_memory();
        db.set_video(&video("v2")).await.unwrap();
        db.set_video(&video("v1")).await.unwrap();

        // Handlers run on the multi-threaded runtime, so the future must be Send.
        let ids = vec!["v1".to_string(), "gone".to_string(), "v2".to_string()];
        let videos = tokio::spawn({
            let db = db.clone();
            async move { db.get_videos(&ids).await }
        })
        .await
        .unwrap()
        .unwrap();

        let found: Vec<&str> = videos.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(found, ["v1", "v2"]);

        let users = tokio::spawn(async move { db.get_users(&["nobody".to_string()]).await })
            .await
            .unwrap()
            .unwrap();
        assert!(users.is_empty());
    }
}
