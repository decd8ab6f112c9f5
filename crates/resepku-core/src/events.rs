//! Session events
//!
//! Controllers publish their state through watch channels; discrete
//! outcomes (a toggle applied, a commit failed) are additionally emitted
//! as [`SessionEvent`]s so the presentation layer can show a message tied
//! to the operation.

use tokio::sync::mpsc;
use tracing::warn;

/// Events emitted by controllers in a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Session opened for a user
    Opened { user_id: String },

    /// Favorite toggle settled successfully
    FavoriteToggled { recipe_id: String, favorited: bool },

    /// Favorite toggle failed; state reverted
    FavoriteToggleFailed { recipe_id: String, error: String },

    /// Favorites list fetched
    FavoritesRefreshed { count: usize },

    /// Favorites list fetch failed
    FavoritesRefreshFailed { error: String },

    /// A profile field was committed
    ProfileFieldCommitted { field: &'static str },

    /// A profile write was rejected or failed
    ProfileWriteFailed { field: &'static str, error: String },

    /// Avatar replaced
    AvatarUpdated { mime_type: String, size: usize },

    /// Avatar removed
    AvatarCleared,

    /// Profile restored to defaults
    ProfileReset,

    /// Session closed
    Closed { user_id: String },
}

/// Sending half of the session event channel
///
/// Emission never blocks: when the channel is full the event is dropped
/// and a warning is logged.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::Sender<SessionEvent>>,
}

impl EventSink {
    /// Create a sink and its receiver
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that discards every event
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Emit an event
    pub fn emit(&self, event: SessionEvent) {
        let Some(tx) = &self.tx else {
            return;
        };

        match tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(
                    "Event channel full, dropping {:?}. Consider increasing event_channel_capacity.",
                    event
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                // Nobody is listening anymore
            }
        }
    }
}
