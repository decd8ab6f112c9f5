// # Profile Editing
//
// Username and bio go through an edit-then-commit session each
// ([`FieldEditor`]); the avatar is replaced or cleared in one step.
//
// All editors of one profile share a single snapshot channel. Every
// successful store read or write publishes the new profile there, so the
// header, the avatar and the field editors never disagree about what is
// stored.

pub mod avatar;
pub mod editor;
pub mod field;

pub use avatar::{AVATAR_MAX_BYTES, AvatarMime, decode_avatar, encode_avatar};
pub use editor::{EditMode, EditSession, FieldEditor, SharedProfile};
pub use field::{Bio, ProfileField, ProfileUpdate, Username, truncate_chars};

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::Result;
use crate::events::{EventSink, SessionEvent};
use crate::traits::{Profile, ProfileStore};

/// Profile page controller
pub struct ProfileEditor {
    store: Arc<dyn ProfileStore>,
    profile: Arc<SharedProfile>,
    username: FieldEditor<Username>,
    bio: FieldEditor<Bio>,
    events: EventSink,
}

impl ProfileEditor {
    /// Read the profile (creating defaults on first access) and build the
    /// field editors in Viewing mode
    pub async fn load(store: Arc<dyn ProfileStore>, events: EventSink) -> Result<Self> {
        let initial = store.read().await?;
        Ok(Self::with_profile(store, initial, events))
    }

    /// Build from an already loaded profile
    pub fn with_profile(store: Arc<dyn ProfileStore>, initial: Profile, events: EventSink) -> Self {
        let profile = Arc::new(SharedProfile::new(initial));

        let username = FieldEditor::new(Arc::clone(&store), Arc::clone(&profile), events.clone());
        let bio = FieldEditor::new(Arc::clone(&store), Arc::clone(&profile), events.clone());

        Self {
            store,
            profile,
            username,
            bio,
            events,
        }
    }

    pub fn username(&self) -> &FieldEditor<Username> {
        &self.username
    }

    pub fn bio(&self) -> &FieldEditor<Bio> {
        &self.bio
    }

    /// Last known stored profile
    pub fn profile(&self) -> Profile {
        self.profile.get()
    }

    /// Subscribe to profile snapshot changes
    pub fn subscribe_profile(&self) -> watch::Receiver<Profile> {
        self.profile.subscribe()
    }

    /// Validate, encode and store a new avatar
    pub async fn set_avatar(&self, bytes: &[u8], mime_type: &str) -> Result<Profile> {
        let (mime, uri) = match encode_avatar(bytes, mime_type) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Rejected avatar upload: {}", e);
                self.emit_failure("avatar", &e);
                return Err(e);
            }
        };

        let profile = self.write(ProfileUpdate::Avatar(Some(uri))).await?;

        info!("Avatar updated ({}, {} bytes)", mime, bytes.len());
        self.events.emit(SessionEvent::AvatarUpdated {
            mime_type: mime.as_str().to_string(),
            size: bytes.len(),
        });
        Ok(profile)
    }

    /// Remove the avatar
    pub async fn clear_avatar(&self) -> Result<Profile> {
        let profile = self.write(ProfileUpdate::Avatar(None)).await?;
        info!("Avatar cleared");
        self.events.emit(SessionEvent::AvatarCleared);
        Ok(profile)
    }

    /// Restore default username, bio and avatar, keeping the user id
    ///
    /// Open edits keep their drafts; only editors in Viewing mode pick up
    /// the defaults.
    pub async fn reset_profile(&self) -> Result<Profile> {
        let profile = match self.store.reset().await {
            Ok(profile) => profile,
            Err(e) => {
                warn!("Failed to reset profile: {}", e);
                self.emit_failure("profile", &e);
                return Err(e);
            }
        };

        self.publish(profile.clone());
        info!("Profile reset to defaults");
        self.events.emit(SessionEvent::ProfileReset);
        Ok(profile)
    }

    /// Re-read the profile from the store
    pub async fn reload(&self) -> Result<Profile> {
        let profile = self.store.read().await?;
        self.publish(profile.clone());
        Ok(profile)
    }

    async fn write(&self, update: ProfileUpdate) -> Result<Profile> {
        let field = update.field();
        match update.apply(self.store.as_ref()).await {
            Ok(profile) => {
                self.publish(profile.clone());
                Ok(profile)
            }
            Err(e) => {
                warn!("Failed to write {}: {}", field, e);
                self.emit_failure(field, &e);
                Err(e)
            }
        }
    }

    fn publish(&self, profile: Profile) {
        self.profile.publish(profile);
    }

    fn emit_failure(&self, field: &'static str, error: &crate::Error) {
        self.events.emit(SessionEvent::ProfileWriteFailed {
            field,
            error: error.user_message(),
        });
    }
}

impl std::fmt::Debug for ProfileEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileEditor")
            .field("user_id", &self.profile.get().user_id)
            .field("username", &self.username)
            .field("bio", &self.bio)
            .finish()
    }
}
