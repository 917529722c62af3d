//! Database layer (Firestore).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;

/// Conflict message when a username or email is already claimed.
pub const IDENTITY_TAKEN: &str = "User with email or username already exists";
/// Conflict message when an email change targets a claimed address.
pub const EMAIL_TAKEN: &str = "Email is already in use";

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const SUBSCRIPTIONS: &str = "subscriptions";
    pub const VIDEOS: &str = "videos";
    /// Username claims, keyed by `claim_doc_id(username)`
    pub const USERNAMES: &str = "usernames";
    /// Email claims, keyed by `claim_doc_id(email)`
    pub const EMAILS: &str = "emails";
}
