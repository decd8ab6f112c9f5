//! Session-scoped read-through cache over a [`FavoritesRepository`]
//!
//! Membership checks are answered from the cached list while it is fresh.
//! Any successful add/remove drops the cache so the next read reflects the
//! service. Each drop bumps a generation counter; a fetch that started
//! before the drop answers its caller but is not stored.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::traits::{FavoriteEntry, FavoritesRepository, MembershipChange};

/// Upper bound on the reuse window (one year)
const MAX_CACHE_AGE_SECS: u64 = 365 * 24 * 60 * 60;

/// A fetched favorites list
#[derive(Debug, Clone)]
struct CachedList {
    entries: Vec<FavoriteEntry>,
    fetched_at: chrono::DateTime<chrono::Utc>,
}

impl CachedList {
    fn new(entries: Vec<FavoriteEntry>) -> Self {
        Self {
            entries,
            fetched_at: chrono::Utc::now(),
        }
    }

    fn is_stale(&self, max_age: chrono::Duration) -> bool {
        chrono::Utc::now().signed_duration_since(self.fetched_at) >= max_age
    }
}

#[derive(Debug, Default)]
struct CacheSlot {
    list: Option<CachedList>,
    generation: u64,
}

/// Favorites of the session user, cached
pub struct CachedFavorites {
    repository: Arc<dyn FavoritesRepository>,
    user_id: String,
    max_age: chrono::Duration,
    cache: RwLock<CacheSlot>,
}

impl CachedFavorites {
    /// Bind a repository to a user
    ///
    /// `max_age_secs` of 0 disables reuse: every read goes to the repository.
    pub fn new(
        repository: Arc<dyn FavoritesRepository>,
        user_id: impl Into<String>,
        max_age_secs: u64,
    ) -> Self {
        let max_age_secs = max_age_secs.min(MAX_CACHE_AGE_SECS) as i64;
        Self {
            repository,
            user_id: user_id.into(),
            max_age: chrono::Duration::seconds(max_age_secs),
            cache: RwLock::new(CacheSlot::default()),
        }
    }

    /// The user this collection belongs to
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// List favorites, from cache when fresh
    pub async fn list(&self) -> Result<Vec<FavoriteEntry>> {
        if let Some(cached) = self.cache.read().await.list.as_ref()
            && !cached.is_stale(self.max_age)
        {
            return Ok(cached.entries.clone());
        }

        self.fetch().await
    }

    /// Whether a recipe is in the collection
    pub async fn is_favorited(&self, recipe_id: &str) -> Result<bool> {
        Ok(self
            .list()
            .await?
            .iter()
            .any(|entry| entry.recipe_id == recipe_id))
    }

    /// Add a recipe; invalidates the cache on success
    pub async fn add(&self, recipe_id: &str) -> Result<MembershipChange> {
        let change = self.repository.add(recipe_id).await?;
        self.invalidate().await;
        debug!("Add {} via {}: {:?}", recipe_id, self.repository.repository_name(), change);
        Ok(change)
    }

    /// Remove a recipe; invalidates the cache on success
    pub async fn remove(&self, recipe_id: &str) -> Result<MembershipChange> {
        let change = self.repository.remove(recipe_id).await?;
        self.invalidate().await;
        debug!("Remove {} via {}: {:?}", recipe_id, self.repository.repository_name(), change);
        Ok(change)
    }

    /// Drop the cache and fetch again
    pub async fn refresh(&self) -> Result<Vec<FavoriteEntry>> {
        self.invalidate().await;
        self.fetch().await
    }

    /// Drop the cached list
    ///
    /// Fetches already in flight will not store their result.
    pub async fn invalidate(&self) {
        let mut slot = self.cache.write().await;
        slot.generation = slot.generation.wrapping_add(1);
        slot.list = None;
    }

    async fn fetch(&self) -> Result<Vec<FavoriteEntry>> {
        let generation = self.cache.read().await.generation;
        let entries = self.repository.list(&self.user_id).await?;
        debug!(
            "Fetched {} favorites for {} via {}",
            entries.len(),
            self.user_id,
            self.repository.repository_name()
        );

        let mut slot = self.cache.write().await;
        if slot.generation == generation {
            slot.list = Some(CachedList::new(entries.clone()));
        } else {
            debug!("Collection changed during fetch, not caching");
        }
        Ok(entries)
    }
}

impl std::fmt::Debug for CachedFavorites {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedFavorites")
            .field("repository", &self.repository.repository_name())
            .field("user_id", &self.user_id)
            .field("max_age", &self.max_age)
            .finish()
    }
}
