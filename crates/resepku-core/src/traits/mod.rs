//! Core traits for the Resepku client
//!
//! This module defines the abstract interfaces that collaborators must follow.
//!
//! - [`ProfileStore`]: Durable profile persistence
//! - [`FavoritesRepository`]: Remote-backed favorites collection

pub mod favorites_repository;
pub mod profile_store;

pub use favorites_repository::{
    Category, Difficulty, FavoriteEntry, FavoritesRepository, MembershipChange,
};
pub use profile_store::{
    BIO_MAX_CHARS, DEFAULT_USERNAME, Profile, ProfileStore, USERNAME_MAX_CHARS,
};
