//! Editable profile fields
//!
//! Each field type describes how to read its committed value from a
//! [`Profile`], how to sanitize keystrokes, how to validate a draft before
//! commit, and which store write it maps to. [`FieldEditor`](super::FieldEditor)
//! is generic over these.

use std::fmt::Debug;

use crate::error::Result;
use crate::traits::{BIO_MAX_CHARS, Profile, ProfileStore, USERNAME_MAX_CHARS};

/// A single store mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileUpdate {
    Username(String),
    Bio(String),
    Avatar(Option<String>),
}

impl ProfileUpdate {
    /// Name of the affected field (for logging and events)
    pub fn field(&self) -> &'static str {
        match self {
            ProfileUpdate::Username(_) => Username::NAME,
            ProfileUpdate::Bio(_) => Bio::NAME,
            ProfileUpdate::Avatar(_) => "avatar",
        }
    }

    /// Send the mutation to the store
    pub async fn apply(self, store: &dyn ProfileStore) -> Result<Profile> {
        match self {
            ProfileUpdate::Username(username) => store.write_username(username).await,
            ProfileUpdate::Bio(bio) => store.write_bio(bio).await,
            ProfileUpdate::Avatar(avatar) => store.write_avatar(avatar).await,
        }
    }
}

/// A profile field that goes through an edit session
pub trait ProfileField: Send + Sync + 'static {
    /// Value type of the draft and committed value
    type Value: Clone + PartialEq + Debug + Send + Sync + 'static;

    /// Field name (for logging and events)
    const NAME: &'static str;

    /// Committed value as stored in the profile
    fn committed(profile: &Profile) -> Self::Value;

    /// Hard input limits applied on every draft update
    fn sanitize(value: Self::Value) -> Self::Value;

    /// Check a draft before it is committed
    fn validate(draft: &Self::Value) -> Result<()>;

    /// Store mutation for a validated draft
    fn update(value: Self::Value) -> ProfileUpdate;
}

/// Username field: at most 50 characters, non-empty after trimming
#[derive(Debug, Clone, Copy)]
pub struct Username;

impl ProfileField for Username {
    type Value = String;
    const NAME: &'static str = "username";

    fn committed(profile: &Profile) -> String {
        profile.username.clone()
    }

    fn sanitize(value: String) -> String {
        truncate_chars(value, USERNAME_MAX_CHARS)
    }

    fn validate(draft: &String) -> Result<()> {
        if draft.trim().is_empty() {
            return Err(crate::Error::validation("Username cannot be empty"));
        }
        Ok(())
    }

    fn update(value: String) -> ProfileUpdate {
        ProfileUpdate::Username(value)
    }
}

/// Bio field: at most 150 characters, may be empty
#[derive(Debug, Clone, Copy)]
pub struct Bio;

impl ProfileField for Bio {
    type Value = String;
    const NAME: &'static str = "bio";

    fn committed(profile: &Profile) -> String {
        profile.bio.clone()
    }

    fn sanitize(value: String) -> String {
        truncate_chars(value, BIO_MAX_CHARS)
    }

    fn validate(_draft: &String) -> Result<()> {
        Ok(())
    }

    fn update(value: String) -> ProfileUpdate {
        ProfileUpdate::Bio(value)
    }
}

/// Cut a string to at most `max` characters
pub fn truncate_chars(mut value: String, max: usize) -> String {
    if let Some((byte_index, _)) = value.char_indices().nth(max) {
        value.truncate(byte_index);
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        assert_eq!(truncate_chars("héllo".to_string(), 2), "hé");
        assert_eq!(truncate_chars("abc".to_string(), 3), "abc");
        assert_eq!(truncate_chars("abc".to_string(), 10), "abc");
        assert_eq!(truncate_chars("abc".to_string(), 0), "");
    }

    #[test]
    fn test_username_rules() {
        assert_eq!(Username::sanitize("a".repeat(51)).chars().count(), 50);
        assert!(Username::validate(&"   ".to_string()).is_err());
        assert!(Username::validate(&"a".repeat(50)).is_ok());
    }

    #[test]
    fn test_bio_rules() {
        assert_eq!(Bio::sanitize("x".repeat(200)).chars().count(), 150);
        assert!(Bio::validate(&String::new()).is_ok());
    }

    #[test]
    fn test_update_field_names() {
        assert_eq!(Username::update("a".to_string()).field(), "username");
        assert_eq!(Bio::update(String::new()).field(), "bio");
        assert_eq!(ProfileUpdate::Avatar(None).field(), "avatar");
    }
}
