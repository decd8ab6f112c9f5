//! User session
//!
//! A [`Session`] binds one profile store and one favorites repository to the
//! user id read from the profile, and hands out the controllers the
//! presentation layer works with.
//!
//! ## Lifecycle
//!
//! 1. [`Session::open()`] validates the settings, reads the profile
//!    (creating defaults on first access) and returns the event receiver
//! 2. Controllers are obtained from the session and shared via `Arc`
//! 3. [`Session::close()`] flushes the profile store
//!
//! Toggle controllers are kept per recipe, so every caller asking for the
//! same recipe shares its in-flight state.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::error::Result;
use crate::events::{EventSink, SessionEvent};
use crate::favorites::{CachedFavorites, FavoriteToggleController, FavoritesFeed};
use crate::profile::ProfileEditor;
use crate::traits::{FavoritesRepository, ProfileStore};

/// One signed-in user's view of profile and favorites
pub struct Session {
    user_id: String,
    profile_store: Arc<dyn ProfileStore>,
    favorites: Arc<CachedFavorites>,
    profile_editor: Arc<ProfileEditor>,
    favorites_feed: Arc<FavoritesFeed>,
    toggles: Mutex<HashMap<String, Arc<FavoriteToggleController>>>,
    events: EventSink,
}

impl Session {
    /// Open a session
    ///
    /// # Returns
    ///
    /// A tuple of (session, event_receiver) where event_receiver yields
    /// session events
    pub async fn open(
        profile_store: Arc<dyn ProfileStore>,
        favorites_repository: Arc<dyn FavoritesRepository>,
        config: SessionConfig,
    ) -> Result<(Self, mpsc::Receiver<SessionEvent>)> {
        config.validate()?;

        let (events, rx) = EventSink::channel(config.event_channel_capacity);

        let profile = profile_store.read().await?;
        let user_id = profile.user_id.clone();

        let favorites = Arc::new(CachedFavorites::new(
            favorites_repository.clone(),
            user_id.clone(),
            config.favorites_max_age_secs,
        ));
        let profile_editor = Arc::new(ProfileEditor::with_profile(
            Arc::clone(&profile_store),
            profile,
            events.clone(),
        ));
        let favorites_feed = Arc::new(FavoritesFeed::new(
            Arc::clone(&favorites),
            events.clone(),
        ));

        info!(
            "Session opened for {} (favorites: {})",
            user_id,
            favorites_repository.repository_name()
        );
        events.emit(SessionEvent::Opened {
            user_id: user_id.clone(),
        });

        let session = Self {
            user_id,
            profile_store,
            favorites,
            profile_editor,
            favorites_feed,
            toggles: Mutex::new(HashMap::new()),
            events,
        };

        Ok((session, rx))
    }

    /// Id of the signed-in user
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn profile_editor(&self) -> Arc<ProfileEditor> {
        Arc::clone(&self.profile_editor)
    }

    pub fn favorites_feed(&self) -> Arc<FavoritesFeed> {
        Arc::clone(&self.favorites_feed)
    }

    /// Cached favorites collection of the user
    pub fn favorites(&self) -> Arc<CachedFavorites> {
        Arc::clone(&self.favorites)
    }

    pub fn profile_store(&self) -> Arc<dyn ProfileStore> {
        Arc::clone(&self.profile_store)
    }

    /// Toggle controller for a recipe
    ///
    /// The first request for a recipe resolves its membership from the
    /// collection; later requests return the same controller. Resolving
    /// does not block lookups of other recipes.
    pub async fn favorite_toggle(
        &self,
        recipe_id: impl Into<String>,
    ) -> Result<Arc<FavoriteToggleController>> {
        let recipe_id = recipe_id.into();

        if let Some(controller) = self.toggles.lock().await.get(&recipe_id) {
            return Ok(Arc::clone(controller));
        }

        let loaded = FavoriteToggleController::load(
            recipe_id.clone(),
            Arc::clone(&self.favorites),
            self.events.clone(),
        )
        .await?;

        // A concurrent request may have inserted first; keep its controller
        let mut toggles = self.toggles.lock().await;
        let controller = toggles
            .entry(recipe_id)
            .or_insert_with(|| {
                debug!(
                    "Created toggle for {} (favorited={})",
                    loaded.recipe_id(),
                    loaded.is_favorited()
                );
                Arc::new(loaded)
            });
        Ok(Arc::clone(controller))
    }

    /// Flush pending profile writes and end the session
    pub async fn close(self) -> Result<()> {
        self.profile_store.flush().await?;
        info!("Session closed for {}", self.user_id);
        self.events.emit(SessionEvent::Closed {
            user_id: self.user_id,
        });
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("favorites", &self.favorites)
            .finish()
    }
}
