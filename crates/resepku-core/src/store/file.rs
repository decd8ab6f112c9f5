// # File Profile Store
//
// File-based implementation of ProfileStore with crash recovery.
//
// ## Purpose
//
// Keeps the profile across application restarts. The user id assigned
// on first access is therefore stable for the lifetime of the file.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of last known good state
// - Recovery: Falls back to backup if corruption detected
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "profile": {
//     "userId": "user_1736424000000",
//     "username": "Pengguna",
//     "bio": "",
//     "avatar": null
//   }
// }
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::profile_store::{
    Profile, ProfileStore, check_bio, ensure_within_quota, normalize_username,
};

/// Profile file format version
const PROFILE_FILE_VERSION: &str = "1.0";

/// File-based profile store with crash recovery
///
/// Every successful write is on disk before the call returns. A write
/// that fails (I/O error, quota exceeded) leaves both the file and the
/// in-memory profile untouched.
///
/// # Example
///
/// ```rust,no_run
/// use resepku_core::store::FileProfileStore;
/// use resepku_core::traits::ProfileStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileProfileStore::new("/var/lib/resepku/profile.json").await?;
///
///     store.write_bio("Suka masak".to_string()).await?;
///     assert_eq!(store.read().await?.bio, "Suka masak");
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileProfileStore {
    path: PathBuf,
    state: Arc<RwLock<Option<Profile>>>,
    quota_bytes: Option<usize>,
}

/// Serializable profile file format
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct ProfileFileFormat {
    version: String,
    profile: Profile,
}

impl FileProfileStore {
    /// Create or load a file profile store
    ///
    /// This will:
    /// 1. Try to load the existing profile file
    /// 2. If corruption is detected, try to load from backup
    /// 3. If both fail, start without a profile (defaults on first read)
    /// 4. Create parent directories if needed
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create profile directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let profile = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(profile)),
            quota_bytes: None,
        })
    }

    /// Limit the serialized profile size
    pub fn with_quota(mut self, quota_bytes: usize) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    /// Path of the profile file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the profile with automatic recovery
    ///
    /// Only parse failures trigger recovery; I/O errors are returned.
    async fn load_with_recovery(path: &Path) -> Result<Option<Profile>, Error> {
        match Self::load(path).await {
            Ok(profile) => Ok(profile),
            Err(LoadError::Io(e)) => Err(e),
            Err(LoadError::Corrupt(e)) => {
                tracing::warn!(
                    "Profile file appears corrupted: {}. Attempting recovery from backup.",
                    e
                );

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    tracing::warn!("No backup file found. Starting with a default profile.");
                    return Ok(None);
                }

                match Self::load(&backup_path).await {
                    Ok(profile) => {
                        tracing::info!("Recovered profile from backup");
                        if let Err(restore_err) = fs::copy(&backup_path, path).await {
                            tracing::error!(
                                "Failed to restore profile file from backup: {}",
                                restore_err
                            );
                        }
                        Ok(profile)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "Backup also unusable: {}. Starting with a default profile.",
                            backup_err
                        );
                        Ok(None)
                    }
                }
            }
        }
    }

    /// Load the profile from a file
    async fn load(path: &Path) -> Result<Option<Profile>, LoadError> {
        if !path.exists() {
            tracing::debug!("Profile file does not exist: {}", path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            LoadError::Io(Error::storage(format!(
                "Failed to read profile file {}: {}",
                path.display(),
                e
            )))
        })?;

        let file: ProfileFileFormat = serde_json::from_str(&content).map_err(|e| {
            LoadError::Corrupt(Error::storage(format!(
                "Failed to parse profile file {}: {}",
                path.display(),
                e
            )))
        })?;

        if file.version != PROFILE_FILE_VERSION {
            tracing::warn!(
                "Profile file version mismatch: expected {}, got {}. Attempting to load anyway.",
                PROFILE_FILE_VERSION,
                file.version
            );
        }

        if file.profile.username.trim().is_empty() {
            return Err(LoadError::Corrupt(Error::storage(format!(
                "Profile file {} has an empty username",
                path.display()
            ))));
        }

        Ok(Some(file.profile))
    }

    /// Write a profile to disk atomically
    async fn write_file(&self, profile: &Profile) -> Result<(), Error> {
        let file = ProfileFileFormat {
            version: PROFILE_FILE_VERSION.to_string(),
            profile: profile.clone(),
        };

        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| Error::storage(format!("Failed to serialize profile: {}", e)))?;

        let temp_path = self.temp_path();
        {
            let mut temp = fs::File::create(&temp_path).await.map_err(|e| {
                Error::storage(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            temp.write_all(json.as_bytes()).await.map_err(|e| {
                Error::storage(format!(
                    "Failed to write temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            temp.flush().await.map_err(|e| {
                Error::storage(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::storage(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Profile written to file: {}", self.path.display());
        Ok(())
    }

    /// Apply a mutation, persist it, and only then make it visible
    async fn mutate<F>(&self, apply: F) -> Result<Profile, Error>
    where
        F: FnOnce(&mut Profile),
    {
        let mut guard = self.state.write().await;
        let mut candidate = guard.clone().unwrap_or_else(Profile::first_access);
        apply(&mut candidate);
        ensure_within_quota(&candidate, self.quota_bytes)?;
        self.write_file(&candidate).await?;
        *guard = Some(candidate.clone());
        Ok(candidate)
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

/// Distinguishes unreadable files from unparseable ones
enum LoadError {
    Io(Error),
    Corrupt(Error),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Io(e) | LoadError::Corrupt(e) => write!(f, "{}", e),
        }
    }
}

#[async_trait]
impl ProfileStore for FileProfileStore {
    async fn read(&self) -> Result<Profile, Error> {
        if let Some(profile) = self.state.read().await.as_ref() {
            return Ok(profile.clone());
        }

        let mut guard = self.state.write().await;
        if let Some(profile) = guard.as_ref() {
            return Ok(profile.clone());
        }

        let profile = Profile::first_access();
        self.write_file(&profile).await?;
        tracing::info!("Created default profile for {}", profile.user_id);
        *guard = Some(profile.clone());
        Ok(profile)
    }

    async fn write_username(&self, username: String) -> Result<Profile, Error> {
        let username = normalize_username(&username)?;
        self.mutate(|profile| profile.username = username).await
    }

    async fn write_bio(&self, bio: String) -> Result<Profile, Error> {
        check_bio(&bio)?;
        self.mutate(|profile| profile.bio = bio).await
    }

    async fn write_avatar(&self, avatar: Option<String>) -> Result<Profile, Error> {
        self.mutate(|profile| profile.avatar = avatar).await
    }

    async fn reset(&self) -> Result<Profile, Error> {
        self.mutate(|profile| *profile = Profile::with_defaults(profile.user_id.clone()))
            .await
    }

    async fn flush(&self) -> Result<(), Error> {
        // Writes are synchronous with each mutation
        Ok(())
    }
}
