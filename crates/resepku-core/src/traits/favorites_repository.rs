// # Favorites Repository Trait
//
// Defines the interface for the remote-backed collection of favorited
// recipes.
//
// ## Implementations
//
// - REST API: `resepku-favorites-http` crate
// - In-memory: `MemoryFavoritesRepository` (tests, offline demo)
//
// ## Usage
//
// ```rust,ignore
// use resepku_core::FavoritesRepository;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let repository = /* FavoritesRepository implementation */;
//
//     let favorites = repository.list("user_1700000000000").await?;
//     repository.add("rendang-padang").await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

/// Result of an add/remove operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    /// Recipe was added to the collection
    Added,
    /// Recipe was removed from the collection
    Removed,
    /// Collection already had the requested membership (no-op)
    Unchanged,
}

/// Recipe category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "makanan", alias = "food")]
    Food,
    #[serde(rename = "minuman", alias = "drink")]
    Drink,
}

/// Recipe difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[serde(alias = "mudah")]
    Easy,
    #[serde(alias = "sedang")]
    Medium,
    #[serde(alias = "sulit")]
    Hard,
}

/// A favorited recipe as returned by the favorites service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteEntry {
    /// Recipe identifier
    #[serde(rename = "id", alias = "recipe_id", deserialize_with = "deserialize_id")]
    pub recipe_id: String,
    /// Recipe name
    pub name: String,
    /// Cover image URL
    #[serde(default)]
    pub image_url: String,
    /// Food or drink
    pub category: Category,
    /// Preparation time in minutes
    #[serde(rename = "prep_time", alias = "prep_time_minutes", default)]
    pub prep_time_minutes: u32,
    /// Difficulty level
    pub difficulty: Difficulty,
    /// Average rating in [0, 5]; out-of-range values are dropped
    #[serde(default, deserialize_with = "deserialize_rating")]
    pub average_rating: Option<f32>,
}

impl FavoriteEntry {
    /// Rating label with one decimal, hidden for unrated recipes
    pub fn display_rating(&self) -> Option<String> {
        self.average_rating
            .filter(|rating| *rating > 0.0)
            .map(|rating| format!("{:.1}", rating))
    }
}

/// Accept both string and numeric recipe ids
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id,
        RawId::Number(id) => id.to_string(),
    })
}

fn deserialize_rating<'de, D>(deserializer: D) -> Result<Option<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(raw
        .filter(|rating| rating.is_finite() && (0.0..=5.0).contains(rating))
        .map(|rating| rating as f32))
}

/// Trait for favorites repository implementations
///
/// The repository is bound to the authenticated user of the session.
/// Caching and membership checks live in `CachedFavorites`; repositories
/// talk to the backing service on every call.
///
/// # Idempotency
///
/// `add` on an already-favorited recipe and `remove` on an absent one
/// must succeed with `MembershipChange::Unchanged`.
///
/// # Errors
///
/// - `Error::Network`: transport failure, timeout, server error
/// - `Error::Auth`: missing or rejected credentials
/// - `Error::NotFound`: unknown recipe id
///
/// Implementations must not retry; the caller decides.
#[async_trait]
pub trait FavoritesRepository: Send + Sync {
    /// List the user's favorited recipes
    ///
    /// An empty vector means the user has no favorites.
    async fn list(&self, user_id: &str) -> Result<Vec<FavoriteEntry>, crate::Error>;

    /// Add a recipe to the collection
    async fn add(&self, recipe_id: &str) -> Result<MembershipChange, crate::Error>;

    /// Remove a recipe from the collection
    async fn remove(&self, recipe_id: &str) -> Result<MembershipChange, crate::Error>;

    /// Get the repository name (for logging/debugging)
    fn repository_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_from_api_json() {
        let json = serde_json::json!({
            "id": 42,
            "name": "Es Teh Manis",
            "image_url": "https://img.example/teh.jpg",
            "category": "minuman",
            "prep_time": 5,
            "difficulty": "mudah",
            "average_rating": 4.25
        });

        let entry: FavoriteEntry = serde_json::from_value(json).unwrap();
        assert_eq!(entry.recipe_id, "42");
        assert_eq!(entry.category, Category::Drink);
        assert_eq!(entry.difficulty, Difficulty::Easy);
        assert_eq!(entry.prep_time_minutes, 5);
        assert_eq!(entry.display_rating().as_deref(), Some("4.2"));
    }

    #[test]
    fn test_out_of_range_rating_dropped() {
        let json = serde_json::json!({
            "recipe_id": "r1",
            "name": "Rendang",
            "category": "food",
            "difficulty": "hard",
            "average_rating": 7.5
        });

        let entry: FavoriteEntry = serde_json::from_value(json).unwrap();
        assert_eq!(entry.average_rating, None);
        assert_eq!(entry.prep_time_minutes, 0);
        assert_eq!(entry.category, Category::Food);
    }

    #[test]
    fn test_zero_rating_hidden() {
        let json = serde_json::json!({
            "id": "r2",
            "name": "Soto",
            "category": "makanan",
            "difficulty": "medium",
            "average_rating": 0
        });

        let entry: FavoriteEntry = serde_json::from_value(json).unwrap();
        assert_eq!(entry.average_rating, Some(0.0));
        assert_eq!(entry.display_rating(), None);
    }
}
