// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT minting and verification for access and refresh tokens.
//!
//! The two token kinds use separate HS256 secrets and lifetimes, so a
//! refresh token never validates as an access token and vice versa.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::Config;
use crate::models::User;

/// Access token claims.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    pub username: String,
    pub fullname: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Refresh token claims.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Unique token ID
    pub jti: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// A freshly minted access/refresh pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signs and verifies session tokens.
#[derive(Clone)]
pub struct TokenService {
    access_secret: Vec<u8>,
    refresh_secret: Vec<u8>,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
}

impl TokenService {
    pub fn new(config: &Config) -> Self {
        Self {
            access_secret: config.access_token_secret.clone(),
            refresh_secret: config.refresh_token_secret.clone(),
            access_ttl_secs: config.access_token_expiry_secs,
            refresh_ttl_secs: config.refresh_token_expiry_secs,
        }
    }

    /// Lifetime of access tokens, for cookie Max-Age.
    pub fn access_ttl_secs(&self) -> u64 {
        self.access_ttl_secs
    }

    /// Lifetime of refresh tokens, for cookie Max-Age.
    pub fn refresh_ttl_secs(&self) -> u64 {
        self.refresh_ttl_secs
    }

    /// Create a short-lived access token carrying the user's identity.
    pub fn create_access_token(&self, user: &User) -> anyhow::Result<String> {
        let now = unix_now()?;

        let claims = AccessClaims {
            sub: user.id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            fullname: user.fullname.clone(),
            iat: now,
            exp: now + self.access_ttl_secs as usize,
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.access_secret),
        )?)
    }

    /// Create a refresh token for `user_id`.
    pub fn create_refresh_token(&self, user_id: &str) -> anyhow::Result<String> {
        let now = unix_now()?;

        let claims = RefreshClaims {
            sub: user_id.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now,
            exp: now + self.refresh_ttl_secs as usize,
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.refresh_secret),
        )?)
    }

    /// Verify signature and expiry of an access token.
    pub fn verify_access_token(
        &self,
        token: &str,
    ) -> Result<AccessClaims, jsonwebtoken::errors::Error> {
        let key = DecodingKey::from_secret(&self.access_secret);
        let validation = Validation::new(Algorithm::HS256);
        decode::<AccessClaims>(token, &key, &validation).map(|data| data.claims)
    }

    /// Verify signature and expiry of a refresh token.
    pub fn verify_refresh_token(
        &self,
        token: &str,
    ) -> Result<RefreshClaims, jsonwebtoken::errors::Error> {
        let key = DecodingKey::from_secret(&self.refresh_secret);
        let validation = Validation::new(Algorithm::HS256);
        decode::<RefreshClaims>(token, &key, &validation).map(|data| data.claims)
    }
}

fn unix_now() -> anyhow::Result<usize> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize)
}
