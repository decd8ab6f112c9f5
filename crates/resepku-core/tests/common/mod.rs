//! Test doubles and common utilities for behavior contract tests
//!
//! The doubles count calls so tests can assert on how often a store or
//! repository was reached, and can be gated or told to fail.

#![allow(dead_code)]

use async_trait::async_trait;
use resepku_core::error::{Error, Result};
use resepku_core::store::MemoryProfileStore;
use resepku_core::traits::{
    Category, Difficulty, FavoriteEntry, FavoritesRepository, MembershipChange, Profile,
    ProfileStore,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Build a favorites entry for tests
pub fn recipe(id: &str) -> FavoriteEntry {
    FavoriteEntry {
        recipe_id: id.to_string(),
        name: format!("Resep {}", id),
        image_url: format!("https://img.example/{}.jpg", id),
        category: Category::Food,
        prep_time_minutes: 30,
        difficulty: Difficulty::Medium,
        average_rating: Some(4.0),
    }
}

/// A mock FavoritesRepository that tracks calls
///
/// When gated, `add` and `remove` wait for [`release`](Self::release)
/// before answering. With a list gate, `list` snapshots the collection and
/// then waits for [`release_list`](Self::release_list).
pub struct MockFavoritesRepository {
    favorites: Arc<std::sync::Mutex<Vec<String>>>,
    list_call_count: Arc<AtomicUsize>,
    add_call_count: Arc<AtomicUsize>,
    remove_call_count: Arc<AtomicUsize>,
    fail_next: Arc<AtomicBool>,
    gate: Option<Arc<Notify>>,
    list_gate: Option<Arc<Notify>>,
}

impl MockFavoritesRepository {
    pub fn new() -> Self {
        Self {
            favorites: Arc::new(std::sync::Mutex::new(Vec::new())),
            list_call_count: Arc::new(AtomicUsize::new(0)),
            add_call_count: Arc::new(AtomicUsize::new(0)),
            remove_call_count: Arc::new(AtomicUsize::new(0)),
            fail_next: Arc::new(AtomicBool::new(false)),
            gate: None,
            list_gate: None,
        }
    }

    /// Repository whose mutations block until released
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Notify::new())),
            ..Self::new()
        }
    }

    /// Repository whose list answers block until released
    pub fn with_gated_list(ids: &[&str]) -> Self {
        Self {
            list_gate: Some(Arc::new(Notify::new())),
            ..Self::with_favorites(ids)
        }
    }

    /// Start with these recipes favorited
    pub fn with_favorites(ids: &[&str]) -> Self {
        let repository = Self::new();
        repository
            .favorites
            .lock()
            .unwrap()
            .extend(ids.iter().map(|id| id.to_string()));
        repository
    }

    /// Let one pending mutation answer
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    /// Let one pending (or the next) list call answer
    pub fn release_list(&self) {
        if let Some(gate) = &self.list_gate {
            gate.notify_one();
        }
    }

    /// Make the next call fail with a network error
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Get the number of times list() was called
    pub fn list_call_count(&self) -> usize {
        self.list_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times add() was called
    pub fn add_call_count(&self) -> usize {
        self.add_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times remove() was called
    pub fn remove_call_count(&self) -> usize {
        self.remove_call_count.load(Ordering::SeqCst)
    }

    /// Currently favorited ids
    pub fn favorite_ids(&self) -> Vec<String> {
        self.favorites.lock().unwrap().clone()
    }

    /// Change the collection behind the cache's back
    pub fn insert_directly(&self, id: &str) {
        self.favorites.lock().unwrap().push(id.to_string());
    }

    /// Create a new MockFavoritesRepository that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            favorites: Arc::clone(&other.favorites),
            list_call_count: Arc::clone(&other.list_call_count),
            add_call_count: Arc::clone(&other.add_call_count),
            remove_call_count: Arc::clone(&other.remove_call_count),
            fail_next: Arc::clone(&other.fail_next),
            gate: other.gate.clone(),
            list_gate: other.list_gate.clone(),
        }
    }

    fn take_failure(&self) -> Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(Error::network("injected failure"));
        }
        Ok(())
    }

    async fn wait_for_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl FavoritesRepository for MockFavoritesRepository {
    async fn list(&self, _user_id: &str) -> Result<Vec<FavoriteEntry>> {
        self.list_call_count.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        let entries: Vec<FavoriteEntry> = self
            .favorites
            .lock()
            .unwrap()
            .iter()
            .map(|id| recipe(id))
            .collect();

        if let Some(gate) = &self.list_gate {
            gate.notified().await;
        }
        Ok(entries)
    }

    async fn add(&self, recipe_id: &str) -> Result<MembershipChange> {
        self.add_call_count.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate().await;
        self.take_failure()?;

        let mut favorites = self.favorites.lock().unwrap();
        if favorites.iter().any(|id| id == recipe_id) {
            return Ok(MembershipChange::Unchanged);
        }
        favorites.push(recipe_id.to_string());
        Ok(MembershipChange::Added)
    }

    async fn remove(&self, recipe_id: &str) -> Result<MembershipChange> {
        self.remove_call_count.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate().await;
        self.take_failure()?;

        let mut favorites = self.favorites.lock().unwrap();
        let before = favorites.len();
        favorites.retain(|id| id != recipe_id);
        if favorites.len() == before {
            Ok(MembershipChange::Unchanged)
        } else {
            Ok(MembershipChange::Removed)
        }
    }

    fn repository_name(&self) -> &'static str {
        "mock"
    }
}

/// A ProfileStore that counts calls and can be told to fail writes
pub struct CountingProfileStore {
    inner: MemoryProfileStore,
    read_call_count: Arc<AtomicUsize>,
    write_call_count: Arc<AtomicUsize>,
    flush_call_count: Arc<AtomicUsize>,
    fail_writes: Arc<AtomicBool>,
    fail_reads: Arc<AtomicBool>,
}

impl CountingProfileStore {
    pub fn new(user_id: &str) -> Self {
        Self {
            inner: MemoryProfileStore::with_profile(Profile::with_defaults(user_id)),
            read_call_count: Arc::new(AtomicUsize::new(0)),
            write_call_count: Arc::new(AtomicUsize::new(0)),
            flush_call_count: Arc::new(AtomicUsize::new(0)),
            fail_writes: Arc::new(AtomicBool::new(false)),
            fail_reads: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get the number of times read() was called
    pub fn read_call_count(&self) -> usize {
        self.read_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of write_* and reset() calls
    pub fn write_call_count(&self) -> usize {
        self.write_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times flush() was called
    pub fn flush_call_count(&self) -> usize {
        self.flush_call_count.load(Ordering::SeqCst)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Create a new CountingProfileStore that shares state and counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            inner: other.inner.clone(),
            read_call_count: Arc::clone(&other.read_call_count),
            write_call_count: Arc::clone(&other.write_call_count),
            flush_call_count: Arc::clone(&other.flush_call_count),
            fail_writes: Arc::clone(&other.fail_writes),
            fail_reads: Arc::clone(&other.fail_reads),
        }
    }

    fn before_write(&self) -> Result<()> {
        self.write_call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::storage("quota exceeded"));
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for CountingProfileStore {
    async fn read(&self) -> Result<Profile> {
        self.read_call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::storage("read failed"));
        }
        self.inner.read().await
    }

    async fn write_username(&self, username: String) -> Result<Profile> {
        self.before_write()?;
        self.inner.write_username(username).await
    }

    async fn write_bio(&self, bio: String) -> Result<Profile> {
        self.before_write()?;
        self.inner.write_bio(bio).await
    }

    async fn write_avatar(&self, avatar: Option<String>) -> Result<Profile> {
        self.before_write()?;
        self.inner.write_avatar(avatar).await
    }

    async fn reset(&self) -> Result<Profile> {
        self.before_write()?;
        self.inner.reset().await
    }

    async fn flush(&self) -> Result<()> {
        self.flush_call_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Wait until a condition holds, yielding to other tasks in between
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
