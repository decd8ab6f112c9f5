// # resepku-core
//
// Core library for the Resepku profile and favorites client.
//
// ## Architecture Overview
//
// - **ProfileStore**: Trait for durable profile fields (username, bio, avatar)
// - **FavoritesRepository**: Trait for the remote list of favorited recipes
// - **CachedFavorites**: Read-through cache answering membership checks
// - **FavoriteToggleController**: Per-recipe toggle with in-flight exclusion
// - **ProfileEditor**: Edit-then-commit sessions for username and bio,
//   one-step avatar replacement
// - **Session**: Binds the above to one user and emits session events
//
// ## Design Principles
//
// 1. **Library-First**: The CLI and any UI sit on top of this crate
// 2. **Observable State**: Controllers publish snapshots on watch channels
// 3. **Plugin Repositories**: Transports live in their own crates behind the
//    FavoritesRepository trait
// 4. **No Silent Failures**: Every operation returns a snapshot or a
//    classified error

pub mod config;
pub mod error;
pub mod events;
pub mod favorites;
pub mod profile;
pub mod session;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use config::{AppConfig, FavoritesConfig, ProfileStoreConfig, SessionConfig};
pub use error::{Error, ErrorKind, Result};
pub use events::{EventSink, SessionEvent};
pub use favorites::{
    CachedFavorites, FavoriteToggleController, FavoritesFeed, FeedState,
    MemoryFavoritesRepository, ToggleOutcome, ToggleState,
};
pub use profile::{EditMode, EditSession, FieldEditor, ProfileEditor, SharedProfile};
pub use session::Session;
pub use store::{FileProfileStore, MemoryProfileStore};
pub use traits::{FavoriteEntry, FavoritesRepository, MembershipChange, Profile, ProfileStore};
