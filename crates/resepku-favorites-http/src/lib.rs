// # HTTP Favorites Repository
//
// This crate provides the REST implementation of `FavoritesRepository`.
//
// ## Behavior
//
// - One HTTP request per repository call; no retries, no background tasks
// - Request timeout from configuration (default 30 seconds)
// - Status codes are classified into core errors, never passed through raw
// - Caching and in-flight exclusion are owned by the core, not by this crate
//
// ## Security Requirements
//
// - The bearer token NEVER appears in logs or `Debug` output
// - An empty token is a configuration error
//
// ## API Reference
//
// - List favorites: GET `{base}/favorites` with header `X-User-Id`
// - Add favorite: POST `{base}/favorites` with body `{"recipe_id": "<id>"}`
// - Remove favorite: DELETE `{base}/favorites/<id>`
//
// The list response is either `{"data": [...]}` or a bare array. Entries
// that cannot be parsed are skipped with a warning.

use async_trait::async_trait;
use resepku_core::config::FavoritesConfig;
use resepku_core::traits::{FavoriteEntry, FavoritesRepository, MembershipChange};
use resepku_core::{Error, Result};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default HTTP timeout for API requests (30 seconds)
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Header carrying the session user id
const USER_ID_HEADER: &str = "X-User-Id";

/// Repository operation, used to classify failed responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Add,
    Remove,
}

impl Operation {
    fn as_str(&self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Add => "add",
            Operation::Remove => "remove",
        }
    }
}

/// REST favorites repository
///
/// # Security
///
/// The Debug implementation does NOT expose the auth token.
pub struct HttpFavoritesRepository {
    /// API base URL without trailing slash
    base_url: String,

    /// Parsed form of `base_url`
    base: reqwest::Url,

    /// User id sent with every request
    user_id: String,

    /// Bearer token
    /// ⚠️ NEVER log this value
    auth_token: Option<String>,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the auth token
impl std::fmt::Debug for HttpFavoritesRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFavoritesRepository")
            .field("base_url", &self.base_url)
            .field("user_id", &self.user_id)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

impl HttpFavoritesRepository {
    /// Create a new repository
    ///
    /// # Parameters
    ///
    /// - `base_url`: API base URL, e.g. `https://api.example.com/api/v1`
    /// - `user_id`: Session user id, sent as `X-User-Id`
    /// - `auth_token`: Optional bearer token
    /// - `timeout`: Per-request timeout
    pub fn new(
        base_url: impl Into<String>,
        user_id: impl Into<String>,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !base_url.starts_with("https://") && !base_url.starts_with("http://") {
            return Err(Error::config(format!(
                "Favorites base URL must use HTTP or HTTPS scheme. Got: {}",
                base_url
            )));
        }
        let base = reqwest::Url::parse(&base_url)
            .map_err(|e| Error::config(format!("Invalid favorites base URL {}: {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(Error::config(format!(
                "Favorites base URL cannot have a path: {}",
                base_url
            )));
        }
        if auth_token.as_ref().is_some_and(|token| token.is_empty()) {
            return Err(Error::config("Favorites auth token cannot be empty when set"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            base,
            user_id: user_id.into(),
            auth_token,
            client,
        })
    }

    /// Create a repository from configuration
    pub fn from_config(config: &FavoritesConfig, user_id: impl Into<String>) -> Result<Self> {
        config.validate()?;
        match config {
            FavoritesConfig::Http {
                base_url,
                auth_token,
                timeout_secs,
            } => Self::new(
                base_url.clone(),
                user_id,
                auth_token.clone(),
                Duration::from_secs(*timeout_secs),
            ),
            _ => Err(Error::config("Invalid config for HTTP favorites repository")),
        }
    }

    /// The API base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Base URL extended by path segments, each percent-encoded as one segment
    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::config("Favorites base URL cannot have a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(
        &self,
        method: reqwest::Method,
        url: reqwest::Url,
        user_id: &str,
    ) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header(USER_ID_HEADER, user_id)
            .header("Accept", "application/json");

        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(
        &self,
        operation: Operation,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        builder.send().await.map_err(|e| {
            // reqwest errors carry the URL but never the headers
            Error::network(format!("{} request failed: {}", operation.as_str(), e))
        })
    }

    async fn failure(
        &self,
        operation: Operation,
        response: reqwest::Response,
    ) -> Result<MembershipChange> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        classify_failure(operation, status, &body)
    }
}

#[async_trait]
impl FavoritesRepository for HttpFavoritesRepository {
    /// List favorites of a user
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /favorites
    /// X-User-Id: <user id>
    /// Authorization: Bearer <token>
    /// ```
    async fn list(&self, user_id: &str) -> Result<Vec<FavoriteEntry>> {
        let url = self.endpoint(&["favorites"])?;
        let builder = self.request(reqwest::Method::GET, url, user_id);
        let response = self.send(Operation::List, builder).await?;

        if !response.status().is_success() {
            // List has no benign failure statuses
            self.failure(Operation::List, response).await?;
            return Err(Error::network("Unexpected list response"));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::network(format!("Failed to read favorites response: {}", e)))?;
        let entries = parse_favorites(&body)?;
        debug!("Fetched {} favorites for {}", entries.len(), user_id);
        Ok(entries)
    }

    /// Add a recipe to the favorites
    ///
    /// 409 Conflict means the recipe is already favorited.
    ///
    /// # API Call
    ///
    /// ```http
    /// POST /favorites
    /// Content-Type: application/json
    ///
    /// {"recipe_id": "<id>"}
    /// ```
    async fn add(&self, recipe_id: &str) -> Result<MembershipChange> {
        let url = self.endpoint(&["favorites"])?;
        let builder = self
            .request(reqwest::Method::POST, url, &self.user_id)
            .json(&serde_json::json!({ "recipe_id": recipe_id }));
        let response = self.send(Operation::Add, builder).await?;

        if !response.status().is_success() {
            return self.failure(Operation::Add, response).await;
        }

        info!("Recipe {} added to favorites", recipe_id);
        Ok(MembershipChange::Added)
    }

    /// Remove a recipe from the favorites
    ///
    /// 404 Not Found means the recipe was not favorited.
    ///
    /// # API Call
    ///
    /// ```http
    /// DELETE /favorites/<id>
    /// ```
    ///
    /// The id is percent-encoded as a single path segment. Ids that would
    /// address the collection itself (empty, `.`, `..`) are rejected.
    async fn remove(&self, recipe_id: &str) -> Result<MembershipChange> {
        if matches!(recipe_id, "" | "." | "..") {
            return Err(Error::validation(format!(
                "Invalid recipe id: {:?}",
                recipe_id
            )));
        }
        let url = self.endpoint(&["favorites", recipe_id])?;
        let builder = self.request(reqwest::Method::DELETE, url, &self.user_id);
        let response = self.send(Operation::Remove, builder).await?;

        if !response.status().is_success() {
            return self.failure(Operation::Remove, response).await;
        }

        info!("Recipe {} removed from favorites", recipe_id);
        Ok(MembershipChange::Removed)
    }

    fn repository_name(&self) -> &'static str {
        "http"
    }
}

/// Map a non-success status to an outcome or a classified error
///
/// | Status        | Result                                   |
/// |---------------|------------------------------------------|
/// | 401, 403      | `Auth`                                   |
/// | 404           | `Unchanged` on remove, else `NotFound`   |
/// | 409           | `Unchanged` on add, else `Network`       |
/// | 429, 5xx      | `Network` (transient)                    |
/// | anything else | `Network`                                |
pub fn classify_failure(operation: Operation, status: u16, body: &str) -> Result<MembershipChange> {
    match (status, operation) {
        (401 | 403, _) => Err(Error::auth(format!(
            "Favorites service rejected the credentials. Status: {}",
            status
        ))),
        (404, Operation::Remove) => {
            debug!("Remove returned 404, recipe was not favorited");
            Ok(MembershipChange::Unchanged)
        }
        (404, _) => Err(Error::not_found(format!(
            "Favorites {} target not found",
            operation.as_str()
        ))),
        (409, Operation::Add) => {
            debug!("Add returned 409, recipe already favorited");
            Ok(MembershipChange::Unchanged)
        }
        (429, _) => Err(Error::network(format!(
            "Rate limit exceeded. Please retry later. Status: {}",
            status
        ))),
        (500..=599, _) => Err(Error::network(format!(
            "Favorites server error (transient): {} - {}",
            status, body
        ))),
        _ => Err(Error::network(format!(
            "Favorites {} failed: {} - {}",
            operation.as_str(),
            status,
            body
        ))),
    }
}

/// Parse a list response body
pub fn parse_favorites(body: &str) -> Result<Vec<FavoriteEntry>> {
    let json: Value = serde_json::from_str(body)
        .map_err(|e| Error::network(format!("Failed to parse favorites response: {}", e)))?;

    let items = match json {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("data") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(Error::network(
                    "Invalid response format: data is not an array",
                ));
            }
        },
        _ => {
            return Err(Error::network(
                "Invalid response format: expected an array or an object with data",
            ));
        }
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<FavoriteEntry>(item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping malformed favorite entry: {}", e);
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use resepku_core::error::ErrorKind;

    fn repository(token: Option<&str>) -> HttpFavoritesRepository {
        HttpFavoritesRepository::new(
            "https://api.example.com/api/v1/",
            "user_1",
            token.map(str::to_string),
            DEFAULT_HTTP_TIMEOUT,
        )
        .unwrap()
    }

    #[test]
    fn test_from_config() {
        let config = FavoritesConfig::Http {
            base_url: "https://api.example.com".to_string(),
            auth_token: Some("token".to_string()),
            timeout_secs: 10,
        };
        assert!(HttpFavoritesRepository::from_config(&config, "user_1").is_ok());
    }

    #[test]
    fn test_endpoint_encodes_recipe_id_as_one_segment() {
        let repository = repository(None);
        assert_eq!(
            repository.endpoint(&["favorites"]).unwrap().as_str(),
            "https://api.example.com/api/v1/favorites"
        );
        assert_eq!(
            repository.endpoint(&["favorites", "a/../b?c#d"]).unwrap().path(),
            "/api/v1/favorites/a%2F..%2Fb%3Fc%23d"
        );
    }

    #[test]
    fn test_from_config_rejects_memory() {
        let result = HttpFavoritesRepository::from_config(&FavoritesConfig::Memory, "user_1");
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_token_rejected() {
        let result = HttpFavoritesRepository::new(
            "https://api.example.com",
            "user_1",
            Some(String::new()),
            DEFAULT_HTTP_TIMEOUT,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_bad_scheme_rejected() {
        let result =
            HttpFavoritesRepository::new("ftp://example.com", "user_1", None, DEFAULT_HTTP_TIMEOUT);
        assert!(result.is_err());
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        assert_eq!(repository(None).base_url(), "https://api.example.com/api/v1");
    }

    #[test]
    fn test_auth_token_not_exposed_in_debug() {
        let debug_str = format!("{:?}", repository(Some("secret_token_12345")));
        assert!(!debug_str.contains("secret_token"));
        assert!(debug_str.contains("<REDACTED>"));
        assert!(debug_str.contains("HttpFavoritesRepository"));
    }

    #[test]
    fn test_repository_name() {
        assert_eq!(repository(None).repository_name(), "http");
    }

    #[test]
    fn test_classify_auth() {
        for status in [401, 403] {
            for operation in [Operation::List, Operation::Add, Operation::Remove] {
                let err = classify_failure(operation, status, "").unwrap_err();
                assert_eq!(err.kind(), ErrorKind::Auth);
            }
        }
    }

    #[test]
    fn test_classify_benign_statuses() {
        assert_eq!(
            classify_failure(Operation::Add, 409, "").unwrap(),
            MembershipChange::Unchanged
        );
        assert_eq!(
            classify_failure(Operation::Remove, 404, "").unwrap(),
            MembershipChange::Unchanged
        );
        assert_eq!(
            classify_failure(Operation::Add, 404, "")
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_classify_transient() {
        for status in [429, 500, 502, 503] {
            let err = classify_failure(Operation::List, status, "busy").unwrap_err();
            assert!(err.is_transient(), "status {} should be transient", status);
        }
        assert_eq!(
            classify_failure(Operation::Remove, 409, "")
                .unwrap_err()
                .kind(),
            ErrorKind::Network
        );
    }

    #[test]
    fn test_parse_envelope_and_bare_array() {
        let entry = r#"{"id":"r1","name":"Soto Ayam","category":"makanan","difficulty":"easy","prep_time":25,"average_rating":4.2}"#;

        let enveloped = parse_favorites(&format!(r#"{{"data":[{}]}}"#, entry)).unwrap();
        let bare = parse_favorites(&format!("[{}]", entry)).unwrap();

        assert_eq!(enveloped, bare);
        assert_eq!(bare[0].recipe_id, "r1");
        assert_eq!(bare[0].prep_time_minutes, 25);
    }

    #[test]
    fn test_parse_skips_malformed_entries() {
        let body = r#"[{"id":"r1","name":"Es Teh","category":"minuman","difficulty":"easy"},{"name":"no id"}]"#;
        let entries = parse_favorites(body).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Es Teh");
    }

    #[test]
    fn test_parse_rejects_unexpected_shape() {
        assert!(parse_favorites(r#"{"data":"nope"}"#).is_err());
        assert!(parse_favorites("42").is_err());
        assert!(parse_favorites("not json").is_err());
    }
}
