// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account creation and profile updates.
//!
//! File inputs arrive as [`TempUpload`] guards owned by the request. They are
//! held until the operation returns, so staging files are deleted after the
//! database write or on the first error, whichever comes first.

use validator::ValidateEmail;

use crate::db::{FirestoreDb, EMAIL_TAKEN, IDENTITY_TAKEN};
use crate::error::{AppError, Result};
use crate::models::user::{fields, normalize_email, normalize_username};
use crate::models::User;
use crate::services::media::MediaService;
use crate::services::password::{hash_password, verify_password};
use crate::time_utils::now_rfc3339;
use crate::uploads::TempUpload;

/// Registration input, already split out of the multipart body.
#[derive(Debug, Default)]
pub struct Registration {
    pub fullname: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub avatar: Option<TempUpload>,
    pub cover_image: Option<TempUpload>,
}

/// Which profile image an upload replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileImage {
    Avatar,
    CoverImage,
}

impl ProfileImage {
    /// Multipart field name carrying the file.
    pub fn form_field(self) -> &'static str {
        match self {
            ProfileImage::Avatar => "avatar",
            ProfileImage::CoverImage => "coverImage",
        }
    }

    fn label(self) -> &'static str {
        match self {
            ProfileImage::Avatar => "Avatar",
            ProfileImage::CoverImage => "Cover image",
        }
    }
}

/// Profile service.
#[derive(Clone)]
pub struct ProfileService {
    db: FirestoreDb,
    media: MediaService,
}

fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ProfileService {
    pub fn new(db: FirestoreDb, media: MediaService) -> Self {
        Self { db, media }
    }

    /// Load the user behind an authenticated request.
    pub async fn current_user(&self, user_id: &str) -> Result<User> {
        self.db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid access token".to_string()))
    }

    /// Create a new account.
    pub async fn register(&self, registration: Registration) -> Result<User> {
        let Registration {
            fullname,
            email,
            username,
            password,
            avatar,
            cover_image,
        } = registration;

        let (Some(fullname), Some(email), Some(username), Some(password)) = (
            required(fullname),
            required(email),
            required(username),
            // Passwords are checked for blankness but stored as typed.
            password.filter(|p| !p.trim().is_empty()),
        ) else {
            return Err(AppError::BadRequest("All fields are required".to_string()));
        };

        let email = normalize_email(&email);
        let username = normalize_username(&username);

        if !email.validate_email() {
            return Err(AppError::BadRequest("Invalid email address".to_string()));
        }

        // Early answer before any upload; insert_user claims the identities
        // atomically and has the final say.
        if self
            .db
            .find_user_by_identity(Some(&username), Some(&email))
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(IDENTITY_TAKEN.to_string()));
        }

        let avatar =
            avatar.ok_or_else(|| AppError::BadRequest("Avatar file is required".to_string()))?;

        let avatar_url = self.media.upload(avatar.path()).await?.url;
        let cover_url = match &cover_image {
            Some(upload) => Some(self.media.upload(upload.path()).await?.url),
            None => None,
        };

        let now = now_rfc3339();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username,
            email,
            fullname,
            password_hash: hash_password(&password).await?,
            avatar: avatar_url,
            cover_image: cover_url,
            refresh_token: None,
            watch_history: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        };

        self.db.insert_user(&user).await?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Change full name and/or email.
    pub async fn update_account(
        &self,
        user_id: &str,
        fullname: Option<String>,
        email: Option<String>,
    ) -> Result<User> {
        let fullname = required(fullname);
        let email = required(email).map(|e| normalize_email(&e));

        if fullname.is_none() && email.is_none() {
            return Err(AppError::BadRequest(
                "fullname or email is required".to_string(),
            ));
        }

        let mut user = self.current_user(user_id).await?;
        let previous_email = user.email.clone();
        let mut changed = vec![fields::UPDATED_AT];

        if let Some(email) = email {
            if !email.validate_email() {
                return Err(AppError::BadRequest("Invalid email address".to_string()));
            }

            if email != user.email {
                let taken = self
                    .db
                    .find_user_by_identity(None, Some(&email))
                    .await?
                    .is_some_and(|other| other.id != user.id);
                if taken {
                    return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
                }
            }

            user.email = email;
            changed.push(fields::EMAIL);
        }

        if let Some(fullname) = fullname {
            user.fullname = fullname;
            changed.push(fields::FULLNAME);
        }

        user.updated_at = now_rfc3339();
        self.db
            .update_user_email(&user, &previous_email, &changed)
            .await?;

        tracing::info!(user_id, fields = ?changed, "Account details updated");
        Ok(user)
    }

    /// Replace the password after checking the current one.
    pub async fn change_password(
        &self,
        user_id: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        if new_password.trim().is_empty() {
            return Err(AppError::BadRequest("New password is required".to_string()));
        }

        let mut user = self.current_user(user_id).await?;

        if !verify_password(old_password, &user.password_hash).await? {
            return Err(AppError::BadRequest("Invalid old password".to_string()));
        }

        user.password_hash = hash_password(new_password).await?;
        user.updated_at = now_rfc3339();
        self.db
            .update_user_fields(&user, &[fields::PASSWORD_HASH, fields::UPDATED_AT])
            .await?;

        tracing::info!(user_id, "Password changed");
        Ok(())
    }

    /// Upload a new avatar or cover image and point the profile at it.
    pub async fn update_image(
        &self,
        user_id: &str,
        kind: ProfileImage,
        upload: Option<TempUpload>,
    ) -> Result<User> {
        let upload = upload
            .ok_or_else(|| AppError::BadRequest(format!("{} file is missing", kind.label())))?;

        let mut user = self.current_user(user_id).await?;
        tracing::debug!(user_id, file = upload.original_name(), "Uploading profile image");
        let url = self.media.upload(upload.path()).await?.url;

        let field = match kind {
            ProfileImage::Avatar => {
                user.avatar = url;
                fields::AVATAR
            }
            ProfileImage::CoverImage => {
                user.cover_image = Some(url);
                fields::COVER_IMAGE
            }
        };
        user.updated_at = now_rfc3339();

        self.db
            .update_user_fields(&user, &[field, fields::UPDATED_AT])
            .await?;

        tracing::info!(user_id, field, "Profile image updated");
        Ok(user)
    }
}
