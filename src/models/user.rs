// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// User document stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// UUID (also used as document ID)
    pub id: String,
    /// Unique, lower-cased handle
    pub username: String,
    /// Unique, lower-cased email address
    pub email: String,
    pub fullname: String,
    /// Argon2 PHC string
    pub password_hash: String,
    /// Avatar URL on the media host
    pub avatar: String,
    /// Cover image URL on the media host
    #[serde(default)]
    pub cover_image: Option<String>,
    /// Currently valid refresh token, if a session is active
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Watched video IDs, oldest first
    #[serde(default)]
    pub watch_history: Vec<String>,
    /// Creation time (ISO 8601)
    pub created_at: String,
    /// Last modification time (ISO 8601)
    pub updated_at: String,
}

/// Document field names, for field-mask updates.
pub mod fields {
    pub const USERNAME: &str = "username";
    pub const EMAIL: &str = "email";
    pub const FULLNAME: &str = "fullname";
    pub const PASSWORD_HASH: &str = "password_hash";
    pub const AVATAR: &str = "avatar";
    pub const COVER_IMAGE: &str = "cover_image";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    pub const WATCH_HISTORY: &str = "watch_history";
    pub const UPDATED_AT: &str = "updated_at";
}

/// Normalize a username for storage and lookup.
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Normalize an email address for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Reservation of one username or email, stored under [`claim_doc_id`].
///
/// A claim is created in the same write as the user document it points at,
/// with a must-not-exist precondition, so two accounts can never hold the
/// same value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentityClaim {
    pub user_id: String,
    pub created_at: String,
}

/// Document ID for a claimed (normalized) username or email.
///
/// Hex keeps arbitrary input, including `/`, valid as a document ID.
pub fn claim_doc_id(value: &str) -> String {
    hex::encode(value.as_bytes())
}

/// Public view of a user: everything except credentials.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub watch_history: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            fullname: user.fullname,
            avatar: user.avatar,
            cover_image: user.cover_image,
            watch_history: user.watch_history,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Minimal owner projection embedded in video listings.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct OwnerSummary {
    pub fullname: String,
    pub username: String,
    pub avatar: String,
}

impl From<&User> for OwnerSummary {
    fn from(user: &User) -> Self {
        Self {
            fullname: user.fullname.clone(),
            username: user.username.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_omits_credentials() {
        let user = User {
            id: "u1".to_string(),
            username: "alice".to_string(),
            email: "alice@x.com".to_string(),
            fullname: "Alice".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            avatar: "https://media/a.png".to_string(),
            cover_image: None,
            refresh_token: Some("token".to_string()),
            watch_history: vec![],
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        };

        let json = serde_json::to_value(UserView::from(user)).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("passwordHash"));
        assert!(!obj.contains_key("password_hash"));
        assert!(!obj.contains_key("refreshToken"));
        assert_eq!(obj["coverImage"], serde_json::Value::Null);
    }

    #[test]
    fn test_normalization() {
        assert_eq!(normalize_username("  Alice "), "alice");
        assert_eq!(normalize_email("Alice@X.com"), "alice@x.com");
    }

    #[test]
    fn test_claim_doc_id_is_path_safe() {
        let id = claim_doc_id("a/b@x.com");
        assert!(!id.contains('/'));
        assert_ne!(id, claim_doc_id("a_b@x.com"));
    }
}
