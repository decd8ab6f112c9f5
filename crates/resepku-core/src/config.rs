//! Configuration types for the Resepku client
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Profile store configuration
    #[serde(default)]
    pub profile_store: ProfileStoreConfig,

    /// Favorites repository configuration
    #[serde(default)]
    pub favorites: FavoritesConfig,

    /// Session settings
    #[serde(default)]
    pub session: SessionConfig,
}

impl AppConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.profile_store.validate()?;
        self.favorites.validate()?;
        self.session.validate()?;
        Ok(())
    }
}

/// Profile store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProfileStoreConfig {
    /// In-memory profile (lost on exit)
    #[default]
    Memory,

    /// JSON file on disk
    File {
        /// Path to the profile file
        path: String,
        /// Optional limit on the serialized profile size
        #[serde(default)]
        quota_bytes: Option<usize>,
    },
}

impl ProfileStoreConfig {
    /// Validate the profile store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProfileStoreConfig::File { path, quota_bytes } => {
                if path.is_empty() {
                    return Err(crate::Error::config("Profile store path cannot be empty"));
                }
                if *quota_bytes == Some(0) {
                    return Err(crate::Error::config("Profile store quota must be > 0"));
                }
                Ok(())
            }
            ProfileStoreConfig::Memory => Ok(()),
        }
    }

    /// Get the store type name
    pub fn type_name(&self) -> &'static str {
        match self {
            ProfileStoreConfig::Memory => "memory",
            ProfileStoreConfig::File { .. } => "file",
        }
    }
}

/// Favorites repository configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FavoritesConfig {
    /// In-memory collection (offline demo, tests)
    #[default]
    Memory,

    /// REST favorites service
    Http {
        /// Base URL of the API (e.g. "https://api.example.com/api/v1")
        base_url: String,
        /// Bearer token, if the service requires one
        #[serde(default)]
        auth_token: Option<String>,
        /// Request timeout in seconds
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

impl FavoritesConfig {
    /// Validate the favorites configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            FavoritesConfig::Http {
                base_url,
                auth_token,
                timeout_secs,
            } => {
                if base_url.is_empty() {
                    return Err(crate::Error::config("Favorites base URL cannot be empty"));
                }
                if !base_url.starts_with("https://") && !base_url.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "Favorites base URL must use HTTP or HTTPS scheme. Got: {}",
                        base_url
                    )));
                }
                if auth_token.as_ref().is_some_and(|token| token.is_empty()) {
                    return Err(crate::Error::config(
                        "Favorites auth token cannot be empty when set",
                    ));
                }
                if *timeout_secs == 0 {
                    return Err(crate::Error::config("Favorites timeout must be > 0"));
                }
                Ok(())
            }
            FavoritesConfig::Memory => Ok(()),
        }
    }

    /// Get the repository type name
    pub fn type_name(&self) -> &'static str {
        match self {
            FavoritesConfig::Memory => "memory",
            FavoritesConfig::Http { .. } => "http",
        }
    }
}

/// Session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How long a fetched favorites list is reused before refetching
    ///
    /// 0 refetches on every membership check.
    #[serde(default = "default_favorites_max_age_secs")]
    pub favorites_max_age_secs: u64,

    /// Capacity of the session event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl SessionConfig {
    /// Validate the session settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            favorites_max_age_secs: default_favorites_max_age_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_favorites_max_age_secs() -> u64 {
    300
}

fn default_event_channel_capacity() -> usize {
    256
}
