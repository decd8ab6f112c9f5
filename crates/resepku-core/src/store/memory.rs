// # Memory Profile Store
//
// In-memory implementation of ProfileStore.
//
// ## Purpose
//
// Keeps the profile for the lifetime of the process only. Useful for
// tests, demos and embedding where the host application persists the
// profile itself.
//
// An optional byte quota mimics the storage limits of browser-style
// key/value storage, so quota failures can be exercised without disk I/O.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::profile_store::{
    Profile, ProfileStore, check_bio, ensure_within_quota, normalize_username,
};

/// In-memory profile store implementation
///
/// # Example
///
/// ```rust,no_run
/// use resepku_core::store::MemoryProfileStore;
/// use resepku_core::traits::ProfileStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryProfileStore::new();
///
///     let profile = store.write_username("Budi".to_string()).await?;
///     assert_eq!(store.read().await?.username, profile.username);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryProfileStore {
    inner: Arc<RwLock<Option<Profile>>>,
    quota_bytes: Option<usize>,
}

impl MemoryProfileStore {
    /// Create an empty store; the first read creates the default profile
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with an existing profile
    pub fn with_profile(profile: Profile) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(profile))),
            quota_bytes: None,
        }
    }

    /// Limit the serialized profile size
    pub fn with_quota(mut self, quota_bytes: usize) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    /// Apply a mutation to a copy of the profile and keep it only if it
    /// fits the quota
    async fn mutate<F>(&self, apply: F) -> Result<Profile, Error>
    where
        F: FnOnce(&mut Profile),
    {
        let mut guard = self.inner.write().await;
        let mut candidate = guard.clone().unwrap_or_else(Profile::first_access);
        apply(&mut candidate);
        ensure_within_quota(&candidate, self.quota_bytes)?;
        *guard = Some(candidate.clone());
        Ok(candidate)
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn read(&self) -> Result<Profile, Error> {
        if let Some(profile) = self.inner.read().await.as_ref() {
            return Ok(profile.clone());
        }

        let mut guard = self.inner.write().await;
        let profile = guard.get_or_insert_with(Profile::first_access);
        tracing::debug!("Created default profile for {}", profile.user_id);
        Ok(profile.clone())
    }

    async fn write_username(&self, username: String) -> Result<Profile, Error> {
        let username = normalize_username(&username)?;
        self.mutate(|profile| profile.username = username).await
    }

    async fn write_bio(&self, bio: String) -> Result<Profile, Error> {
        check_bio(&bio)?;
        self.mutate(|profile| profile.bio = bio).await
    }

    async fn write_avatar(&self, avatar: Option<String>) -> Result<Profile, Error> {
        self.mutate(|profile| profile.avatar = avatar).await
    }

    async fn reset(&self) -> Result<Profile, Error> {
        self.mutate(|profile| *profile = Profile::with_defaults(profile.user_id.clone()))
            .await
    }

    async fn flush(&self) -> Result<(), Error> {
        // Nothing buffered
        Ok(())
    }
}
