//! Edit-then-commit state machine for one profile field
//!
//! ```text
//! Viewing(committed) ── begin_edit ──▶ Editing(draft)
//!        ▲                              │      ▲
//!        │                        commit│      │ store failure
//!        │ cancel (re-read store)       ▼      │
//!        └──────────── Editing ◀── Committing ─┘
//!                                       │
//!        Viewing(committed') ◀── success┘
//! ```

use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::field::ProfileField;
use crate::error::{Error, Result};
use crate::events::{EventSink, SessionEvent};
use crate::traits::{Profile, ProfileStore};

/// Edit mode of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditMode {
    Viewing,
    Editing,
    Committing,
}

/// Observable edit state of one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditSession<T> {
    /// Showing the committed value
    Viewing { committed: T },
    /// User is editing a draft
    Editing { committed: T, draft: T },
    /// Draft is being written to the store
    Committing { committed: T, draft: T },
}

impl<T> EditSession<T> {
    pub fn mode(&self) -> EditMode {
        match self {
            EditSession::Viewing { .. } => EditMode::Viewing,
            EditSession::Editing { .. } => EditMode::Editing,
            EditSession::Committing { .. } => EditMode::Committing,
        }
    }

    /// Last value known to be in the store
    pub fn committed(&self) -> &T {
        match self {
            EditSession::Viewing { committed }
            | EditSession::Editing { committed, .. }
            | EditSession::Committing { committed, .. } => committed,
        }
    }

    /// Staged value, if an edit is open
    pub fn draft(&self) -> Option<&T> {
        match self {
            EditSession::Viewing { .. } => None,
            EditSession::Editing { draft, .. } | EditSession::Committing { draft, .. } => {
                Some(draft)
            }
        }
    }

    pub fn is_editing(&self) -> bool {
        matches!(self, EditSession::Editing { .. })
    }

    pub fn is_committing(&self) -> bool {
        matches!(self, EditSession::Committing { .. })
    }
}

type Follower = Box<dyn Fn(&Profile) + Send + Sync>;

/// Profile snapshot shared by all editors of one profile
///
/// [`publish`](Self::publish) first moves every field editor that is
/// Viewing to the new committed value, then notifies snapshot subscribers.
pub struct SharedProfile {
    profile: watch::Sender<Profile>,
    followers: Mutex<Vec<Follower>>,
}

impl SharedProfile {
    pub fn new(initial: Profile) -> Self {
        let (profile, _) = watch::channel(initial);
        Self {
            profile,
            followers: Mutex::new(Vec::new()),
        }
    }

    /// Last published profile
    pub fn get(&self) -> Profile {
        self.profile.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Profile> {
        self.profile.subscribe()
    }

    /// Publish a profile read from or written to the store
    pub fn publish(&self, profile: Profile) {
        let followers = self
            .followers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for follow in followers.iter() {
            follow(&profile);
        }
        drop(followers);
        self.profile.send_replace(profile);
    }

    fn follow(&self, follower: Follower) {
        self.followers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(follower);
    }
}

impl std::fmt::Debug for SharedProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedProfile")
            .field("profile", &*self.profile.borrow())
            .finish()
    }
}

/// Edit controller for one profile field
pub struct FieldEditor<F: ProfileField> {
    store: Arc<dyn ProfileStore>,
    profile: Arc<SharedProfile>,
    session: Arc<watch::Sender<EditSession<F::Value>>>,
    events: EventSink,
    _field: PhantomData<fn() -> F>,
}

impl<F: ProfileField> FieldEditor<F> {
    /// Create an editor in Viewing mode
    ///
    /// `profile` is the snapshot shared with the other editors of the
    /// same profile; it is updated after every store read or write, and
    /// this editor follows it while Viewing.
    pub fn new(store: Arc<dyn ProfileStore>, profile: Arc<SharedProfile>, events: EventSink) -> Self {
        let committed = F::committed(&profile.get());
        let (session, _) = watch::channel(EditSession::Viewing { committed });
        let session = Arc::new(session);

        let follower = Arc::clone(&session);
        profile.follow(Box::new(move |profile: &Profile| {
            follow_committed::<F>(&follower, profile)
        }));

        Self {
            store,
            profile,
            session,
            events,
            _field: PhantomData,
        }
    }

    /// Current edit state
    pub fn session(&self) -> EditSession<F::Value> {
        self.session.borrow().clone()
    }

    pub fn mode(&self) -> EditMode {
        self.session.borrow().mode()
    }

    /// Subscribe to edit state changes
    pub fn subscribe(&self) -> watch::Receiver<EditSession<F::Value>> {
        self.session.subscribe()
    }

    /// Enter edit mode with the draft set to the stored value
    ///
    /// Returns `Ok(false)` without doing anything if an edit is already open.
    pub async fn begin_edit(&self) -> Result<bool> {
        if self.mode() != EditMode::Viewing {
            return Ok(false);
        }

        let profile = self.store.read().await?;
        let committed = F::committed(&profile);
        self.profile.publish(profile);

        let began = self.session.send_if_modified(|session| {
            if !matches!(session, EditSession::Viewing { .. }) {
                return false;
            }
            *session = EditSession::Editing {
                committed: committed.clone(),
                draft: committed,
            };
            true
        });

        if began {
            debug!("Editing {}", F::NAME);
        }
        Ok(began)
    }

    /// Replace the draft
    ///
    /// Input beyond the field's length limit is cut off, not rejected.
    pub fn update_draft(&self, value: F::Value) -> Result<()> {
        let value = F::sanitize(value);
        let mut editing = false;

        self.session.send_if_modified(|session| {
            let EditSession::Editing { draft, .. } = session else {
                return false;
            };
            editing = true;
            if *draft == value {
                return false;
            }
            *draft = value;
            true
        });

        if !editing {
            return Err(Error::invalid_state(format!(
                "{} is not being edited",
                F::NAME
            )));
        }
        Ok(())
    }

    /// Validate and store the draft
    ///
    /// - Invalid draft: `Error::Validation`, stays Editing, store untouched
    /// - Store failure: the store error, back to Editing with the draft kept
    /// - Success: Viewing with the stored value
    pub async fn commit(&self) -> Result<Profile> {
        let mut validation = Ok(());
        let mut pending = None;

        self.session.send_if_modified(|session| {
            let EditSession::Editing { committed, draft } = session else {
                return false;
            };
            if let Err(e) = F::validate(draft) {
                validation = Err(e);
                return false;
            }
            let next = EditSession::Committing {
                committed: committed.clone(),
                draft: draft.clone(),
            };
            pending = Some((committed.clone(), draft.clone()));
            *session = next;
            true
        });

        if let Err(e) = validation {
            debug!("Rejected {} draft: {}", F::NAME, e);
            self.emit_failure(&e);
            return Err(e);
        }

        let Some((committed, draft)) = pending else {
            return Err(Error::invalid_state(format!(
                "{} is not being edited",
                F::NAME
            )));
        };

        let guard = CommitGuard {
            session: &self.session,
            committed,
            draft: draft.clone(),
            settled: false,
        };

        match F::update(draft).apply(self.store.as_ref()).await {
            Ok(profile) => {
                guard.settle(EditSession::Viewing {
                    committed: F::committed(&profile),
                });
                self.profile.publish(profile.clone());
                info!("Committed {}", F::NAME);
                self.events
                    .emit(SessionEvent::ProfileFieldCommitted { field: F::NAME });
                Ok(profile)
            }
            Err(e) => {
                // Back to Editing with the draft kept
                drop(guard);
                warn!("Failed to commit {}: {}", F::NAME, e);
                self.emit_failure(&e);
                Err(e)
            }
        }
    }

    /// Leave edit mode, discarding the draft
    ///
    /// The committed value is re-read from the store so that changes made
    /// elsewhere during the edit are not hidden. Returns `Ok(false)` if no
    /// edit was open; a commit in progress cannot be cancelled.
    pub async fn cancel(&self) -> Result<bool> {
        if self.mode() != EditMode::Editing {
            return Ok(false);
        }

        let fresh = match self.store.read().await {
            Ok(profile) => {
                let committed = F::committed(&profile);
                self.profile.publish(profile);
                Ok(committed)
            }
            Err(e) => {
                warn!("Could not re-read profile while cancelling {}: {}", F::NAME, e);
                Err(e)
            }
        };

        let mut cancelled = false;
        self.session.send_if_modified(|session| {
            let EditSession::Editing { committed, .. } = session else {
                return false;
            };
            let committed = match &fresh {
                Ok(value) => value.clone(),
                Err(_) => committed.clone(),
            };
            *session = EditSession::Viewing { committed };
            cancelled = true;
            true
        });

        if cancelled {
            debug!("Cancelled {} edit", F::NAME);
        }
        fresh.map(|_| cancelled)
    }

    fn emit_failure(&self, error: &Error) {
        self.events.emit(SessionEvent::ProfileWriteFailed {
            field: F::NAME,
            error: error.user_message(),
        });
    }
}

impl<F: ProfileField> std::fmt::Debug for FieldEditor<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldEditor")
            .field("field", &F::NAME)
            .field("session", &*self.session.borrow())
            .finish()
    }
}

/// Adopt a newer profile while Viewing; open edits keep their state
fn follow_committed<F: ProfileField>(
    session: &watch::Sender<EditSession<F::Value>>,
    profile: &Profile,
) {
    let committed = F::committed(profile);
    session.send_if_modified(|session| match session {
        EditSession::Viewing { committed: current } if *current != committed => {
            *current = committed;
            true
        }
        _ => false,
    });
}

/// Returns the field to Editing if a commit future is dropped before the
/// store answered
struct CommitGuard<'a, T: Clone> {
    session: &'a watch::Sender<EditSession<T>>,
    committed: T,
    draft: T,
    settled: bool,
}

impl<T: Clone> CommitGuard<'_, T> {
    fn settle(mut self, next: EditSession<T>) {
        self.settled = true;
        self.session.send_replace(next);
    }
}

impl<T: Clone> Drop for CommitGuard<'_, T> {
    fn drop(&mut self) {
        if !self.settled {
            self.session.send_replace(EditSession::Editing {
                committed: self.committed.clone(),
                draft: self.draft.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::field::{Bio, Username};
    use crate::store::MemoryProfileStore;

    fn editor<F: ProfileField>(store: Arc<MemoryProfileStore>) -> FieldEditor<F> {
        let profile = Arc::new(SharedProfile::new(Profile::with_defaults("user_1")));
        FieldEditor::new(store, profile, EventSink::disabled())
    }

    #[tokio::test]
    async fn test_begin_edit_twice_is_noop() {
        let store = Arc::new(MemoryProfileStore::with_profile(Profile::with_defaults(
            "user_1",
        )));
        let username = editor::<Username>(store);

        assert!(username.begin_edit().await.unwrap());
        username.update_draft("Budi".to_string()).unwrap();
        assert!(!username.begin_edit().await.unwrap());
        assert_eq!(username.session().draft().map(String::as_str), Some("Budi"));
    }

    #[tokio::test]
    async fn test_update_draft_outside_edit_rejected() {
        let store = Arc::new(MemoryProfileStore::new());
        let bio = editor::<Bio>(store);

        let result = bio.update_draft("hello".to_string());
        assert!(matches!(result, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_commit_outside_edit_rejected() {
        let store = Arc::new(MemoryProfileStore::new());
        let bio = editor::<Bio>(store);

        assert!(matches!(bio.commit().await, Err(Error::InvalidState(_))));
        assert!(!bio.cancel().await.unwrap());
    }

    #[tokio::test]
    async fn test_commit_bio() {
        let store = Arc::new(MemoryProfileStore::with_profile(Profile::with_defaults(
            "user_1",
        )));
        let bio = editor::<Bio>(Arc::clone(&store));

        bio.begin_edit().await.unwrap();
        bio.update_draft("Suka pedas".to_string()).unwrap();
        let profile = bio.commit().await.unwrap();

        assert_eq!(profile.bio, "Suka pedas");
        assert_eq!(
            bio.session(),
            EditSession::Viewing {
                committed: "Suka pedas".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_follows_published_profile_only_while_viewing() {
        let store = Arc::new(MemoryProfileStore::with_profile(Profile::with_defaults(
            "user_1",
        )));
        let profile = Arc::new(SharedProfile::new(Profile::with_defaults("user_1")));
        let username: FieldEditor<Username> =
            FieldEditor::new(store, Arc::clone(&profile), EventSink::disabled());

        let mut newer = Profile::with_defaults("user_1");
        newer.username = "Ani".to_string();
        profile.publish(newer.clone());
        assert_eq!(username.session().committed(), "Ani");

        username.begin_edit().await.unwrap();
        let committed = username.session().committed().clone();
        newer.username = "Tono".to_string();
        profile.publish(newer);
        assert_eq!(username.mode(), EditMode::Editing);
        assert_eq!(username.session().committed(), &committed);
    }

    #[tokio::test]
    async fn test_sibling_follows_reads_made_by_other_field() {
        let store = Arc::new(MemoryProfileStore::with_profile(Profile::with_defaults(
            "user_1",
        )));
        let profile = Arc::new(SharedProfile::new(Profile::with_defaults("user_1")));
        let username: FieldEditor<Username> =
            FieldEditor::new(store.clone(), Arc::clone(&profile), EventSink::disabled());
        let bio: FieldEditor<Bio> =
            FieldEditor::new(store.clone(), Arc::clone(&profile), EventSink::disabled());

        store.write_bio("Ditulis dari perangkat lain".to_string()).await.unwrap();
        username.begin_edit().await.unwrap();

        assert_eq!(bio.session().committed(), "Ditulis dari perangkat lain");
        assert_eq!(profile.get().bio, "Ditulis dari perangkat lain");
    }
}
