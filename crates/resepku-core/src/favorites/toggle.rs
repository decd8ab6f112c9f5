//! Per-recipe favorite toggle
//!
//! ## States
//!
//! ```text
//! Idle(favorited) ── toggle() ──▶ InFlight(previous)
//!        ▲                              │
//!        │        success: Idle(!previous)
//!        └────────────────────────────── failure: Idle(previous)
//! ```
//!
//! A `toggle()` issued while one is in flight is dropped, not queued: the
//! repository sees at most one request per recipe at any time.

use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

use super::CachedFavorites;
use crate::error::Result;
use crate::events::{EventSink, SessionEvent};

/// Observable state of one recipe's favorite button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ToggleState {
    /// Whether the recipe is in the user's favorites
    pub is_favorited: bool,
    /// Whether a toggle request is pending
    pub is_in_flight: bool,
}

/// Result of a `toggle()` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The request went through; the recipe is now in this state
    Applied { favorited: bool },
    /// Another toggle was already in flight; nothing was sent
    Ignored,
}

/// Favorite state machine for a single recipe
///
/// Controllers for different recipes share nothing but the cached
/// favorites collection and run independently.
pub struct FavoriteToggleController {
    recipe_id: String,
    favorites: Arc<CachedFavorites>,
    state: watch::Sender<ToggleState>,
    events: EventSink,
}

impl FavoriteToggleController {
    /// Create a controller with a known initial membership
    pub fn new(
        recipe_id: impl Into<String>,
        favorites: Arc<CachedFavorites>,
        events: EventSink,
        favorited: bool,
    ) -> Self {
        let (state, _) = watch::channel(ToggleState {
            is_favorited: favorited,
            is_in_flight: false,
        });

        Self {
            recipe_id: recipe_id.into(),
            favorites,
            state,
            events,
        }
    }

    /// Create a controller, resolving membership from the collection
    pub async fn load(
        recipe_id: impl Into<String>,
        favorites: Arc<CachedFavorites>,
        events: EventSink,
    ) -> Result<Self> {
        let recipe_id = recipe_id.into();
        let favorited = favorites.is_favorited(&recipe_id).await?;
        Ok(Self::new(recipe_id, favorites, events, favorited))
    }

    /// The recipe this controller is bound to
    pub fn recipe_id(&self) -> &str {
        &self.recipe_id
    }

    /// Current state snapshot
    pub fn state(&self) -> ToggleState {
        *self.state.borrow()
    }

    pub fn is_favorited(&self) -> bool {
        self.state.borrow().is_favorited
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.borrow().is_in_flight
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<ToggleState> {
        self.state.subscribe()
    }

    /// State changes as a stream, starting with the current state
    pub fn changes(&self) -> WatchStream<ToggleState> {
        WatchStream::new(self.state.subscribe())
    }

    /// Flip the favorite state of the recipe
    ///
    /// Returns `ToggleOutcome::Ignored` without touching the repository if
    /// a toggle is already in flight. On failure the previous state is
    /// restored and the error is returned; there is no automatic retry.
    pub async fn toggle(&self) -> Result<ToggleOutcome> {
        let Some(in_flight) = InFlight::acquire(&self.state) else {
            debug!("Toggle for {} already in flight, ignoring", self.recipe_id);
            return Ok(ToggleOutcome::Ignored);
        };

        let target = !in_flight.previous;
        let result = if target {
            self.favorites.add(&self.recipe_id).await
        } else {
            self.favorites.remove(&self.recipe_id).await
        };

        match result {
            Ok(change) => {
                in_flight.settle(target);
                info!("Recipe {} favorited={} ({:?})", self.recipe_id, target, change);
                self.events.emit(SessionEvent::FavoriteToggled {
                    recipe_id: self.recipe_id.clone(),
                    favorited: target,
                });
                Ok(ToggleOutcome::Applied { favorited: target })
            }
            Err(e) => {
                let previous = in_flight.previous;
                in_flight.settle(previous);
                warn!("Toggle for {} failed, reverted: {}", self.recipe_id, e);
                self.events.emit(SessionEvent::FavoriteToggleFailed {
                    recipe_id: self.recipe_id.clone(),
                    error: e.user_message(),
                });
                Err(e)
            }
        }
    }

    /// Re-read membership from the collection
    ///
    /// Skipped while a toggle is in flight. Returns the resulting state.
    pub async fn reconcile(&self) -> Result<ToggleState> {
        if self.is_in_flight() {
            return Ok(self.state());
        }

        let favorited = self.favorites.is_favorited(&self.recipe_id).await?;
        self.state.send_if_modified(|state| {
            if state.is_in_flight || state.is_favorited == favorited {
                return false;
            }
            state.is_favorited = favorited;
            true
        });
        Ok(self.state())
    }
}

impl std::fmt::Debug for FavoriteToggleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FavoriteToggleController")
            .field("recipe_id", &self.recipe_id)
            .field("state", &self.state())
            .finish()
    }
}

/// Exclusive in-flight marker for one toggle
///
/// If the toggle future is dropped before settling, the previous state is
/// restored so the button never stays disabled.
struct InFlight<'a> {
    state: &'a watch::Sender<ToggleState>,
    previous: bool,
    settled: bool,
}

impl<'a> InFlight<'a> {
    fn acquire(state: &'a watch::Sender<ToggleState>) -> Option<Self> {
        let mut previous = false;
        let acquired = state.send_if_modified(|current| {
            if current.is_in_flight {
                return false;
            }
            previous = current.is_favorited;
            current.is_in_flight = true;
            true
        });

        acquired.then_some(Self {
            state,
            previous,
            settled: false,
        })
    }

    fn settle(mut self, favorited: bool) {
        self.settled = true;
        self.state.send_replace(ToggleState {
            is_favorited: favorited,
            is_in_flight: false,
        });
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.state.send_replace(ToggleState {
                is_favorited: self.previous,
                is_in_flight: false,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::favorites::MemoryFavoritesRepository;
    use crate::traits::{Category, Difficulty, FavoriteEntry};

    async fn favorites_with(ids: &[&str]) -> Arc<CachedFavorites> {
        let repository = Arc::new(MemoryFavoritesRepository::new("user_1"));
        for id in ids {
            repository
                .insert_recipe(FavoriteEntry {
                    recipe_id: id.to_string(),
                    name: "Gado-gado".to_string(),
                    image_url: String::new(),
                    category: Category::Food,
                    prep_time_minutes: 15,
                    difficulty: Difficulty::Easy,
                    average_rating: None,
                })
                .await;
        }
        Arc::new(CachedFavorites::new(repository, "user_1", 300))
    }

    #[tokio::test]
    async fn test_toggle_on_and_off() {
        let favorites = favorites_with(&["r1"]).await;
        let controller =
            FavoriteToggleController::load("r1", favorites, EventSink::disabled())
                .await
                .unwrap();
        assert_eq!(controller.state(), ToggleState::default());

        let outcome = controller.toggle().await.unwrap();
        assert_eq!(outcome, ToggleOutcome::Applied { favorited: true });
        assert_eq!(
            controller.state(),
            ToggleState {
                is_favorited: true,
                is_in_flight: false
            }
        );

        controller.toggle().await.unwrap();
        assert!(!controller.is_favorited());
    }

    #[tokio::test]
    async fn test_failure_reverts() {
        // r2 is unknown to the repository, so add fails with NotFound
        let favorites = favorites_with(&[]).await;
        let controller =
            FavoriteToggleController::new("r2", favorites, EventSink::disabled(), false);

        let result = controller.toggle().await;
        assert!(result.is_err());
        assert_eq!(controller.state(), ToggleState::default());
    }

    #[tokio::test]
    async fn test_reconcile_picks_up_external_change() {
        let favorites = favorites_with(&["r1"]).await;
        let controller = FavoriteToggleController::new(
            "r1",
            Arc::clone(&favorites),
            EventSink::disabled(),
            false,
        );

        favorites.add("r1").await.unwrap();
        let state = controller.reconcile().await.unwrap();
        assert!(state.is_favorited);
    }

    #[test]
    fn test_dropped_in_flight_restores_state() {
        let (state, _) = watch::channel(ToggleState {
            is_favorited: true,
            is_in_flight: false,
        });

        let guard = InFlight::acquire(&state).unwrap();
        assert!(state.borrow().is_in_flight);
        assert!(InFlight::acquire(&state).is_none());
        drop(guard);

        assert_eq!(
            *state.borrow(),
            ToggleState {
                is_favorited: true,
                is_in_flight: false
            }
        );
    }
}
