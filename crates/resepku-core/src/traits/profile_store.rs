// # Profile Store Trait
//
// Defines the interface for durable profile persistence.
//
// ## Purpose
//
// The profile store owns the single user's profile fields:
// - The user id (assigned once, on first access)
// - Username and bio
// - Avatar image as an embeddable data URI
//
// Writes must be visible to the next `read()` in the same session
// (read-your-writes). The medium is opaque to the controllers.
//
// ## Implementations
//
// - Memory: `MemoryProfileStore`
// - File-based: `FileProfileStore` (JSON, atomic writes)
//
// ## Usage
//
// ```rust,ignore
// use resepku_core::ProfileStore;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let store = /* ProfileStore implementation */;
//
//     let profile = store.read().await?;
//     let profile = store.write_bio("Suka masak rendang".to_string()).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Username shown until the user picks one
pub const DEFAULT_USERNAME: &str = "Pengguna";

/// Maximum username length, in characters
pub const USERNAME_MAX_CHARS: usize = 50;

/// Maximum bio length, in characters
pub const BIO_MAX_CHARS: usize = 150;

/// The user's profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Stable user identifier
    pub user_id: String,
    /// Display name, never empty once persisted
    pub username: String,
    /// Free-form bio
    #[serde(default)]
    pub bio: String,
    /// Avatar image as a `data:` URI
    #[serde(default)]
    pub avatar: Option<String>,
}

impl Profile {
    /// Create a profile with default fields for the given user
    pub fn with_defaults(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: DEFAULT_USERNAME.to_string(),
            bio: String::new(),
            avatar: None,
        }
    }

    /// Create a default profile with a freshly generated user id
    ///
    /// # Visibility
    ///
    /// Only stores create profiles; callers read them through a store.
    pub(crate) fn first_access() -> Self {
        Self::with_defaults(format!("user_{}", chrono::Utc::now().timestamp_millis()))
    }

    /// Whether an avatar is set
    pub fn has_avatar(&self) -> bool {
        self.avatar.is_some()
    }

    /// Bio for display, with a placeholder when empty
    pub fn bio_or_placeholder(&self) -> &str {
        if self.bio.is_empty() {
            "No bio yet."
        } else {
            &self.bio
        }
    }
}

/// Check the persisted-username invariant
///
/// Returns the trimmed username on success.
pub fn normalize_username(username: &str) -> Result<String, crate::Error> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(crate::Error::validation("Username cannot be empty"));
    }
    if trimmed.chars().count() > USERNAME_MAX_CHARS {
        return Err(crate::Error::validation(format!(
            "Username cannot be longer than {} characters",
            USERNAME_MAX_CHARS
        )));
    }
    Ok(trimmed.to_string())
}

/// Check the bio length limit
pub fn check_bio(bio: &str) -> Result<(), crate::Error> {
    if bio.chars().count() > BIO_MAX_CHARS {
        return Err(crate::Error::validation(format!(
            "Bio cannot be longer than {} characters",
            BIO_MAX_CHARS
        )));
    }
    Ok(())
}

/// Reject a profile whose serialized size exceeds the store quota
pub(crate) fn ensure_within_quota(
    profile: &Profile,
    quota_bytes: Option<usize>,
) -> Result<(), crate::Error> {
    let Some(quota) = quota_bytes else {
        return Ok(());
    };

    let size = serde_json::to_vec(profile)?.len();
    if size > quota {
        return Err(crate::Error::storage(format!(
            "Storage quota exceeded: profile needs {} bytes, quota is {} bytes",
            size, quota
        )));
    }
    Ok(())
}

/// Trait for profile store implementations
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Invariants
///
/// - `read()` never fails with "not found": the first read creates and
///   persists a default profile
/// - The username is never persisted empty; `write_username` fails with
///   `Error::Validation` instead
/// - A successful write is visible to the next `read()`
///
/// # Errors
///
/// Persistence failures (I/O, quota exceeded) are reported as
/// `Error::Storage`. The in-memory store only fails when a quota is set.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Read the current profile, creating the default one on first access
    async fn read(&self) -> Result<Profile, crate::Error>;

    /// Persist a new username
    ///
    /// The value is trimmed before it is stored.
    async fn write_username(&self, username: String) -> Result<Profile, crate::Error>;

    /// Persist a new bio
    async fn write_bio(&self, bio: String) -> Result<Profile, crate::Error>;

    /// Persist a new avatar data URI, or clear it with `None`
    async fn write_avatar(&self, avatar: Option<String>) -> Result<Profile, crate::Error>;

    /// Restore default username, bio and avatar, keeping the user id
    async fn reset(&self) -> Result<Profile, crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;
}
