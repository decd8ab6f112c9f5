// # Memory Favorites Repository
//
// In-memory implementation of FavoritesRepository.
//
// ## Purpose
//
// Stands in for the favorites service in tests, demos and offline use.
// It knows a catalog of recipes (so `add` can fail with NotFound for
// unknown ids) and the ordered favorites of a single user.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::{FavoriteEntry, FavoritesRepository, MembershipChange};

#[derive(Debug, Default)]
struct Collection {
    catalog: HashMap<String, FavoriteEntry>,
    favorites: Vec<String>,
}

/// In-memory favorites repository bound to one user
#[derive(Debug, Clone)]
pub struct MemoryFavoritesRepository {
    user_id: String,
    inner: Arc<RwLock<Collection>>,
}

impl MemoryFavoritesRepository {
    /// Create an empty repository for a user
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            inner: Arc::new(RwLock::new(Collection::default())),
        }
    }

    /// Make a recipe known to the repository
    pub async fn insert_recipe(&self, entry: FavoriteEntry) {
        let mut guard = self.inner.write().await;
        guard.catalog.insert(entry.recipe_id.clone(), entry);
    }

    /// Number of favorited recipes
    pub async fn len(&self) -> usize {
        self.inner.read().await.favorites.len()
    }

    /// Check if the user has no favorites
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.favorites.is_empty()
    }
}

#[async_trait]
impl FavoritesRepository for MemoryFavoritesRepository {
    async fn list(&self, user_id: &str) -> Result<Vec<FavoriteEntry>, Error> {
        if user_id != self.user_id {
            return Err(Error::auth(format!(
                "Session is not authorized to read favorites of {}",
                user_id
            )));
        }

        let guard = self.inner.read().await;
        Ok(guard
            .favorites
            .iter()
            .filter_map(|id| guard.catalog.get(id).cloned())
            .collect())
    }

    async fn add(&self, recipe_id: &str) -> Result<MembershipChange, Error> {
        let mut guard = self.inner.write().await;
        if !guard.catalog.contains_key(recipe_id) {
            return Err(Error::not_found(format!("Recipe not found: {}", recipe_id)));
        }
        if guard.favorites.iter().any(|id| id == recipe_id) {
            return Ok(MembershipChange::Unchanged);
        }
        guard.favorites.push(recipe_id.to_string());
        Ok(MembershipChange::Added)
    }

    async fn remove(&self, recipe_id: &str) -> Result<MembershipChange, Error> {
        let mut guard = self.inner.write().await;
        let before = guard.favorites.len();
        guard.favorites.retain(|id| id != recipe_id);
        if guard.favorites.len() == before {
            Ok(MembershipChange::Unchanged)
        } else {
            Ok(MembershipChange::Removed)
        }
    }

    fn repository_name(&self) -> &'static str {
        "memory"
    }
}
