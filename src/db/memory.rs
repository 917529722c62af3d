// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store used for tests and local runs.
//!
//! Mirrors the Firestore collections with one `DashMap` per collection,
//! keyed by document ID. Identity claims map a username or email to the
//! owning user ID.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::db::{EMAIL_TAKEN, IDENTITY_TAKEN};
use crate::error::AppError;
use crate::models::user::fields;
use crate::models::{Subscription, User, Video};

#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    subscriptions: DashMap<String, Subscription>,
    videos: DashMap<String, Video>,
    usernames: DashMap<String, String>,
    emails: DashMap<String, String>,
}

/// Claim `value` for `user_id`. False if anyone already holds it.
fn claim(map: &DashMap<String, String>, value: &str, user_id: &str) -> bool {
    match map.entry(value.to_string()) {
        Entry::Occupied(_) => false,
        Entry::Vacant(slot) => {
            slot.insert(user_id.to_string());
            true
        }
    }
}

fn release(map: &DashMap<String, String>, value: &str, user_id: &str) {
    map.remove_if(value, |_, owner| owner == user_id);
}

impl MemoryStore {
    pub fn get_user(&self, id: &str) -> Option<User> {
        self.users.get(id).map(|u| u.value().clone())
    }

    pub fn find_user(&self, username: Option<&str>, email: Option<&str>) -> Option<User> {
        self.users
            .iter()
            .find(|u| {
                username.is_some_and(|name| u.username == name)
                    || email.is_some_and(|mail| u.email == mail)
            })
            .map(|u| u.value().clone())
    }

    /// Claim the username and email, then create the user document.
    /// Nothing is left behind when any step fails.
    pub fn insert_user(&self, user: &User) -> Result<(), AppError> {
        if !claim(&self.usernames, &user.username, &user.id) {
            return Err(AppError::Conflict(IDENTITY_TAKEN.to_string()));
        }
        if !claim(&self.emails, &user.email, &user.id) {
            release(&self.usernames, &user.username, &user.id);
            return Err(AppError::Conflict(IDENTITY_TAKEN.to_string()));
        }

        match self.users.entry(user.id.clone()) {
            Entry::Occupied(_) => {
                release(&self.usernames, &user.username, &user.id);
                release(&self.emails, &user.email, &user.id);
                Err(AppError::Conflict(format!(
                    "User document {} already exists",
                    user.id
                )))
            }
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(())
            }
        }
    }

    /// Move the email claim from `previous_email` to `user.email` and write
    /// the listed fields.
    pub fn update_user_email(
        &self,
        user: &User,
        previous_email: &str,
        field_paths: &[&str],
    ) -> Result<(), AppError> {
        if user.email == previous_email {
            return self.update_user_fields(user, field_paths);
        }
        if !claim(&self.emails, &user.email, &user.id) {
            return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
        }

        if let Err(e) = self.update_user_fields(user, field_paths) {
            release(&self.emails, &user.email, &user.id);
            return Err(e);
        }

        release(&self.emails, previous_email, &user.id);
        Ok(())
    }

    pub fn update_user_fields(&self, user: &User, field_paths: &[&str]) -> Result<(), AppError> {
        let mut stored = self
            .users
            .get_mut(&user.id)
            .ok_or_else(|| AppError::Database(format!("User document {} not found", user.id)))?;

        for path in field_paths {
            match *path {
                fields::USERNAME => stored.username = user.username.clone(),
                fields::EMAIL => stored.email = user.email.clone(),
                fields::FULLNAME => stored.fullname = user.fullname.clone(),
                fields::PASSWORD_HASH => stored.password_hash = user.password_hash.clone(),
                fields::AVATAR => stored.avatar = user.avatar.clone(),
                fields::COVER_IMAGE => stored.cover_image = user.cover_image.clone(),
                fields::REFRESH_TOKEN => stored.refresh_token = user.refresh_token.clone(),
                fields::WATCH_HISTORY => stored.watch_history = user.watch_history.clone(),
                fields::UPDATED_AT => stored.updated_at = user.updated_at.clone(),
                other => {
                    return Err(AppError::Database(format!("Unknown user field: {}", other)));
                }
            }
        }

        Ok(())
    }

    pub fn get_video(&self, id: &str) -> Option<Video> {
        self.videos.get(id).map(|v| v.value().clone())
    }

    pub fn set_video(&self, video: &Video) {
        self.videos.insert(video.id.clone(), video.clone());
    }

    pub fn get_subscription(&self, subscriber: &str, channel: &str) -> Option<Subscription> {
        self.subscriptions
            .get(&Subscription::doc_id(subscriber, channel))
            .map(|s| s.value().clone())
    }

    pub fn set_subscription(&self, subscription: &Subscription) {
        self.subscriptions.insert(
            Subscription::doc_id(&subscription.subscriber, &subscription.channel),
            subscription.clone(),
        );
    }

    pub fn delete_subscription(&self, subscriber: &str, channel: &str) {
        self.subscriptions
            .remove(&Subscription::doc_id(subscriber, channel));
    }

    pub fn subscriptions_where(&self, pred: impl Fn(&Subscription) -> bool) -> Vec<Subscription> {
        self.subscriptions
            .iter()
            .filter(|s| pred(s.value()))
            .map(|s| s.value().clone())
            .collect()
    }
}
