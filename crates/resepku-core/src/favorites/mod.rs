//! Favorites synchronization
//!
//! - [`CachedFavorites`]: read-through cache of the session user's collection
//! - [`FavoriteToggleController`]: per-recipe toggle with in-flight exclusion
//! - [`FavoritesFeed`]: observable list with loading/error states
//! - [`MemoryFavoritesRepository`]: in-memory repository implementation

pub mod cache;
pub mod feed;
pub mod memory;
pub mod toggle;

pub use cache::CachedFavorites;
pub use feed::{FavoritesFeed, FeedState};
pub use memory::MemoryFavoritesRepository;
pub use toggle::{FavoriteToggleController, ToggleOutcome, ToggleState};
