// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential verification and session token lifecycle.
//!
//! Handles:
//! - Login: identifier + password check against the stored hash
//! - Token issuance with the refresh token persisted on the user
//! - Refresh-token rotation with reuse detection
//! - Logout (server-side refresh token revocation)

use subtle::ConstantTimeEq;

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::user::{fields, normalize_email, normalize_username};
use crate::models::User;
use crate::services::password::verify_password;
use crate::services::tokens::{TokenPair, TokenService};
use crate::time_utils::now_rfc3339;

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    db: FirestoreDb,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(db: FirestoreDb, tokens: TokenService) -> Self {
        Self { db, tokens }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Find the user by username or email and check the password.
    pub async fn verify_credentials(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        password: &str,
    ) -> Result<User> {
        let username = username
            .map(normalize_username)
            .filter(|u| !u.is_empty());
        let email = email.map(normalize_email).filter(|e| !e.is_empty());

        if username.is_none() && email.is_none() {
            return Err(AppError::BadRequest(
                "username or email is required".to_string(),
            ));
        }

        let user = self
            .db
            .find_user_by_identity(username.as_deref(), email.as_deref())
            .await?
            .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

        if !verify_password(password, &user.password_hash).await? {
            tracing::info!(user_id = %user.id, "Rejected login: wrong password");
            return Err(AppError::Unauthorized(
                "Invalid user credentials".to_string(),
            ));
        }

        Ok(user)
    }

    /// Mint a new token pair and store the refresh token on the user.
    ///
    /// Any previously stored refresh token stops being accepted.
    pub async fn issue_tokens(&self, user: &User) -> Result<TokenPair> {
        let access_token = self
            .tokens
            .create_access_token(user)
            .map_err(|e| AppError::Internal(e.context("Access token creation failed")))?;
        let refresh_token = self
            .tokens
            .create_refresh_token(&user.id)
            .map_err(|e| AppError::Internal(e.context("Refresh token creation failed")))?;

        let mut updated = user.clone();
        updated.refresh_token = Some(refresh_token.clone());
        updated.updated_at = now_rfc3339();

        self.db
            .update_user_fields(&updated, &[fields::REFRESH_TOKEN, fields::UPDATED_AT])
            .await?;

        tracing::debug!(user_id = %user.id, "Issued token pair");

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Log in: verify credentials, then issue tokens.
    pub async fn login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        password: &str,
    ) -> Result<(User, TokenPair)> {
        let mut user = self.verify_credentials(username, email, password).await?;
        let pair = self.issue_tokens(&user).await?;
        user.refresh_token = Some(pair.refresh_token.clone());

        tracing::info!(user_id = %user.id, "User logged in");
        Ok((user, pair))
    }

    /// Exchange a refresh token for a new pair.
    pub async fn refresh(&self, incoming: Option<&str>) -> Result<(User, TokenPair)> {
        let incoming = incoming
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Unauthorized request".to_string()))?;

        let claims = self
            .tokens
            .verify_refresh_token(incoming)
            .map_err(|e| AppError::Unauthorized(format!("Invalid refresh token: {}", e)))?;

        let user = self
            .db
            .get_user(&claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".to_string()))?;

        let matches = user
            .refresh_token
            .as_deref()
            .is_some_and(|stored| bool::from(stored.as_bytes().ct_eq(incoming.as_bytes())));

        if !matches {
            tracing::warn!(user_id = %user.id, "Refresh token reuse or revoked session");
            return Err(AppError::Unauthorized(
                "Refresh token is expired or used".to_string(),
            ));
        }

        let pair = self.issue_tokens(&user).await?;
        tracing::info!(user_id = %user.id, "Access token refreshed");
        Ok((user, pair))
    }

    /// Revoke the stored refresh token for `user_id`.
    pub async fn logout(&self, user_id: &str) -> Result<()> {
        let Some(mut user) = self.db.get_user(user_id).await? else {
            tracing::warn!(user_id, "Logout for unknown user");
            return Ok(());
        };

        user.refresh_token = None;
        user.updated_at = now_rfc3339();
        self.db
            .update_user_fields(&user, &[fields::REFRESH_TOKEN, fields::UPDATED_AT])
            .await?;

        tracing::info!(user_id, "User logged out");
        Ok(())
    }
}
