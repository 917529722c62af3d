// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Argon2 password hashing.
//!
//! Hashing and verification are CPU-bound, so both run on the blocking pool.

use anyhow::Context;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tokio::task;

use crate::error::{AppError, Result};

/// Hash a password into an Argon2id PHC string.
pub async fn hash_password(password: &str) -> Result<String> {
    let password = password.to_string();

    let hash = task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))
    })
    .await
    .context("Password hashing task panicked")??;

    Ok(hash)
}

/// Check a plaintext password against a stored PHC string.
pub async fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let password = password.to_string();
    let password_hash = password_hash.to_string();

    let is_valid = task::spawn_blocking(move || {
        let parsed_hash = PasswordHash::new(&password_hash)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

        Ok::<bool, anyhow::Error>(
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok(),
        )
    })
    .await
    .context("Password verification task panicked")?
    .map_err(AppError::Internal)?;

    Ok(is_valid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_then_verify() {
        let hash = hash_password("p1").await.unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("p1", &hash).await.unwrap());
        assert!(!verify_password("p2", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_same_password_gets_distinct_salts() {
        let a = hash_password("p1").await.unwrap();
        let b = hash_password("p1").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_garbage_hash_is_internal_error() {
        let err = verify_password("p1", "not-a-hash").await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
