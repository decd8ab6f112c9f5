//! Observable favorites list for the profile page

use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

use super::CachedFavorites;
use crate::error::Result;
use crate::events::{EventSink, SessionEvent};
use crate::traits::FavoriteEntry;

/// Snapshot of the favorites list view
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedState {
    /// Last successfully fetched favorites
    pub entries: Vec<FavoriteEntry>,
    /// A fetch is in progress
    pub loading: bool,
    /// Message of the last failed fetch, cleared by the next attempt
    pub error: Option<String>,
}

impl FeedState {
    /// Loaded successfully and the user has no favorites
    pub fn is_empty_result(&self) -> bool {
        !self.loading && self.error.is_none() && self.entries.is_empty()
    }
}

/// Favorites list with loading and error states
pub struct FavoritesFeed {
    favorites: Arc<CachedFavorites>,
    state: watch::Sender<FeedState>,
    events: EventSink,
}

impl FavoritesFeed {
    pub fn new(favorites: Arc<CachedFavorites>, events: EventSink) -> Self {
        let (state, _) = watch::channel(FeedState::default());
        Self {
            favorites,
            state,
            events,
        }
    }

    /// Current snapshot
    pub fn state(&self) -> FeedState {
        self.state.borrow().clone()
    }

    /// Subscribe to snapshot changes
    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state.subscribe()
    }

    /// Fetch the list from the service, bypassing the cache
    ///
    /// On failure the previously loaded entries stay visible.
    pub async fn refresh(&self) -> Result<Vec<FavoriteEntry>> {
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        match self.favorites.refresh().await {
            Ok(entries) => {
                self.state.send_modify(|state| {
                    state.entries = entries.clone();
                    state.loading = false;
                });
                self.events.emit(SessionEvent::FavoritesRefreshed {
                    count: entries.len(),
                });
                Ok(entries)
            }
            Err(e) => {
                warn!("Failed to load favorites: {}", e);
                let message = e.user_message();
                self.state.send_modify(|state| {
                    state.loading = false;
                    state.error = Some(message.clone());
                });
                self.events
                    .emit(SessionEvent::FavoritesRefreshFailed { error: message });
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for FavoritesFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FavoritesFeed")
            .field("state", &*self.state.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::favorites::MemoryFavoritesRepository;

    #[tokio::test]
    async fn test_empty_result() {
        let repository = Arc::new(MemoryFavoritesRepository::new("user_1"));
        let favorites = Arc::new(CachedFavorites::new(repository, "user_1", 300));
        let feed = FavoritesFeed::new(favorites, EventSink::disabled());

        assert!(feed.refresh().await.unwrap().is_empty());
        assert!(feed.state().is_empty_result());
    }

    #[tokio::test]
    async fn test_failure_sets_error() {
        // Bound to a different user than the repository allows
        let repository = Arc::new(MemoryFavoritesRepository::new("user_1"));
        let favorites = Arc::new(CachedFavorites::new(repository, "user_2", 300));
        let feed = FavoritesFeed::new(favorites, EventSink::disabled());

        assert!(feed.refresh().await.is_err());
        let state = feed.state();
        assert!(!state.loading);
        assert!(state.error.is_some());
        assert!(!state.is_empty_result());
    }
}
