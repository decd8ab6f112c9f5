// # resepku - Profile and favorites CLI
//
// Thin command line layer over resepku-core. It reads configuration from
// environment variables, opens a session and runs one command against it.
// No profile or favorites logic lives here.
//
// ## Configuration
//
// ### Profile Store
// - `RESEPKU_PROFILE_STORE_TYPE`: Type of profile store (file, memory)
// - `RESEPKU_PROFILE_STORE_PATH`: Path to the profile file (for file store)
// - `RESEPKU_PROFILE_QUOTA_BYTES`: Optional size limit of the stored profile
//
// ### Favorites
// - `RESEPKU_FAVORITES_URL`: Base URL of the favorites API (in-memory if unset)
// - `RESEPKU_FAVORITES_TOKEN`: Bearer token (optional)
// - `RESEPKU_HTTP_TIMEOUT_SECS`: Request timeout in seconds
// - `RESEPKU_CACHE_MAX_AGE_SECS`: How long a fetched favorites list is reused
//
// ### Logging
// - `RESEPKU_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export RESEPKU_PROFILE_STORE_TYPE=file
// export RESEPKU_PROFILE_STORE_PATH=~/.config/resepku/profile.json
// export RESEPKU_FAVORITES_URL=https://api.example.com/api/v1
//
// resepku profile set-username "Budi"
// resepku favorites toggle 42
// ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use resepku_core::config::{AppConfig, FavoritesConfig, ProfileStoreConfig, SessionConfig};
use resepku_core::profile::{AVATAR_MAX_BYTES, decode_avatar};
use resepku_core::traits::{Category, Difficulty, FavoritesRepository, ProfileStore};
use resepku_core::{FileProfileStore, MemoryFavoritesRepository, MemoryProfileStore, Session};
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: Command completed
/// - 1: Configuration or startup error
/// - 2: Command failed
#[derive(Debug, Clone, Copy)]
enum ResepkuExitCode {
    /// Command completed
    Success = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Command failed at runtime
    RuntimeError = 2,
}

impl From<ResepkuExitCode> for ExitCode {
    fn from(code: ResepkuExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Parser)]
#[command(name = "resepku")]
#[command(about = "Manage your Resepku profile and favorite recipes", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },

    Favorites {
        #[command(subcommand)]
        command: FavoritesCommand,
    },
}

#[derive(Subcommand)]
enum ProfileCommand {
    /// Print the stored profile
    Show,

    /// Change the username (at most 50 characters)
    SetUsername { username: String },

    /// Change the bio (at most 150 characters)
    SetBio { bio: String },

    /// Upload a PNG or JPEG avatar (at most 2 MB)
    SetAvatar {
        file: PathBuf,

        /// MIME type; guessed from the file extension if omitted
        #[arg(long)]
        mime: Option<String>,
    },

    /// Remove the avatar
    ClearAvatar,

    /// Restore the default username, bio and avatar
    Reset,
}

#[derive(Subcommand)]
enum FavoritesCommand {
    /// List favorite recipes
    List,

    /// Add or remove a recipe from the favorites
    Toggle { recipe_id: String },

    /// Check whether a recipe is a favorite
    Check { recipe_id: String },
}

/// Application configuration
struct Config {
    profile_store_type: String,
    profile_store_path: Option<String>,
    profile_quota_bytes: Option<usize>,
    favorites_url: Option<String>,
    favorites_token: Option<String>,
    http_timeout_secs: Option<u64>,
    cache_max_age_secs: Option<u64>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            profile_store_type: env::var("RESEPKU_PROFILE_STORE_TYPE")
                .unwrap_or_else(|_| "file".to_string()),
            profile_store_path: env::var("RESEPKU_PROFILE_STORE_PATH").ok(),
            profile_quota_bytes: parse_env("RESEPKU_PROFILE_QUOTA_BYTES")?,
            favorites_url: env::var("RESEPKU_FAVORITES_URL")
                .ok()
                .filter(|url| !url.is_empty()),
            favorites_token: env::var("RESEPKU_FAVORITES_TOKEN").ok(),
            http_timeout_secs: parse_env("RESEPKU_HTTP_TIMEOUT_SECS")?,
            cache_max_age_secs: parse_env("RESEPKU_CACHE_MAX_AGE_SECS")?,
            log_level: env::var("RESEPKU_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        match self.profile_store_type.as_str() {
            "file" => {
                if self.profile_store_path.as_ref().is_none_or(|p| p.is_empty()) {
                    anyhow::bail!(
                        "RESEPKU_PROFILE_STORE_PATH is required when RESEPKU_PROFILE_STORE_TYPE=file. \
                        Set it via: export RESEPKU_PROFILE_STORE_PATH=~/.config/resepku/profile.json"
                    );
                }
            }
            "memory" => {}
            _ => anyhow::bail!(
                "RESEPKU_PROFILE_STORE_TYPE '{}' is not supported. \
                Supported types: file, memory",
                self.profile_store_type
            ),
        }

        if let Some(timeout) = self.http_timeout_secs
            && !(1..=300).contains(&timeout)
        {
            anyhow::bail!(
                "RESEPKU_HTTP_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                timeout
            );
        }

        if self.favorites_url.is_none() && self.favorites_token.is_some() {
            anyhow::bail!("RESEPKU_FAVORITES_TOKEN is set but RESEPKU_FAVORITES_URL is not");
        }

        #[cfg(not(feature = "http"))]
        {
            if self.favorites_url.is_some() {
                anyhow::bail!("RESEPKU_FAVORITES_URL is set but this build has no HTTP support");
            }
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "RESEPKU_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        self.app_config().validate()?;
        Ok(())
    }

    /// Core configuration derived from the environment
    fn app_config(&self) -> AppConfig {
        let profile_store = match self.profile_store_type.as_str() {
            "file" => ProfileStoreConfig::File {
                path: self.profile_store_path.clone().unwrap_or_default(),
                quota_bytes: self.profile_quota_bytes,
            },
            _ => ProfileStoreConfig::Memory,
        };

        let favorites = match &self.favorites_url {
            Some(base_url) => FavoritesConfig::Http {
                base_url: base_url.clone(),
                auth_token: self.favorites_token.clone(),
                timeout_secs: self.http_timeout_secs.unwrap_or(30),
            },
            None => FavoritesConfig::Memory,
        };

        let mut session = SessionConfig::default();
        if let Some(max_age) = self.cache_max_age_secs {
            session.favorites_max_age_secs = max_age;
        }

        AppConfig {
            profile_store,
            favorites,
            session,
        }
    }
}

/// Parse an optional numeric environment variable
fn parse_env<T: FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{} must be a number. Got: {}", name, value)),
        Err(_) => Ok(None),
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ResepkuExitCode::ConfigError.into()
            } else {
                ResepkuExitCode::Success.into()
            };
        }
    };

    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return ResepkuExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return ResepkuExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    // Command output goes to stdout, logs to stderr
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ResepkuExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ResepkuExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let session = match open_session(&config.app_config()).await {
            Ok(session) => session,
            Err(e) => {
                eprintln!("Startup error: {}", describe(&e));
                return ResepkuExitCode::ConfigError;
            }
        };

        match run_command(&session, cli.command).await {
            Ok(()) => match session.close().await {
                Ok(()) => ResepkuExitCode::Success,
                Err(e) => {
                    eprintln!("Error: {}", e.user_message());
                    ResepkuExitCode::RuntimeError
                }
            },
            Err(e) => {
                error!("Command failed: {:#}", e);
                eprintln!("Error: {}", describe(&e));
                ResepkuExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Build the store and repository from configuration and open a session
async fn open_session(config: &AppConfig) -> Result<Session> {
    let profile_store: Arc<dyn ProfileStore> = match &config.profile_store {
        ProfileStoreConfig::File { path, quota_bytes } => {
            let store = FileProfileStore::new(expand_home(path)).await?;
            match quota_bytes {
                Some(quota) => Arc::new(store.with_quota(*quota)),
                None => Arc::new(store),
            }
        }
        ProfileStoreConfig::Memory => Arc::new(MemoryProfileStore::new()),
    };

    // The repository is bound to the user id stored in the profile
    let user_id = profile_store.read().await?.user_id;

    let repository: Arc<dyn FavoritesRepository> = match &config.favorites {
        #[cfg(feature = "http")]
        favorites @ FavoritesConfig::Http { .. } => Arc::new(
            resepku_favorites_http::HttpFavoritesRepository::from_config(favorites, &user_id)?,
        ),
        #[cfg(not(feature = "http"))]
        FavoritesConfig::Http { .. } => {
            anyhow::bail!("HTTP favorites are not available in this build")
        }
        FavoritesConfig::Memory => Arc::new(MemoryFavoritesRepository::new(&user_id)),
    };

    info!(
        "Profile store: {}, favorites: {}",
        config.profile_store.type_name(),
        config.favorites.type_name()
    );

    let (session, mut events) =
        Session::open(profile_store, repository, config.session.clone()).await?;

    // Events are only logged; the CLI reports results directly
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!("Session event: {:?}", event);
        }
    });

    Ok(session)
}

async fn run_command(session: &Session, command: Commands) -> Result<()> {
    match command {
        Commands::Profile { command } => run_profile_command(session, command).await,
        Commands::Favorites { command } => run_favorites_command(session, command).await,
    }
}

async fn run_profile_command(session: &Session, command: ProfileCommand) -> Result<()> {
    let editor = session.profile_editor();

    let profile = match command {
        ProfileCommand::Show => editor.reload().await?,
        ProfileCommand::SetUsername { username } => {
            editor.username().begin_edit().await?;
            editor.username().update_draft(username)?;
            editor.username().commit().await?
        }
        ProfileCommand::SetBio { bio } => {
            editor.bio().begin_edit().await?;
            editor.bio().update_draft(bio)?;
            editor.bio().commit().await?
        }
        ProfileCommand::SetAvatar { file, mime } => {
            let mime = match mime {
                Some(mime) => mime,
                None => guess_mime(&file)?,
            };
            let bytes = read_avatar_file(&file).await?;
            editor.set_avatar(&bytes, &mime).await?
        }
        ProfileCommand::ClearAvatar => editor.clear_avatar().await?,
        ProfileCommand::Reset => editor.reset_profile().await?,
    };

    println!("User:     {}", profile.user_id);
    println!("Username: {}", profile.username);
    println!("Bio:      {}", profile.bio_or_placeholder());
    match profile.avatar.as_deref().map(decode_avatar) {
        Some(Ok((mime, bytes))) => println!("Avatar:   {} ({} bytes)", mime, bytes.len()),
        Some(Err(_)) => println!("Avatar:   (unreadable)"),
        None => println!("Avatar:   none"),
    }
    Ok(())
}

async fn run_favorites_command(session: &Session, command: FavoritesCommand) -> Result<()> {
    match command {
        FavoritesCommand::List => {
            let entries = session.favorites_feed().refresh().await?;
            if entries.is_empty() {
                println!("No favorite recipes yet.");
            }
            for entry in entries {
                println!(
                    "{}\t{}\t{}\t{} min\t{}\t{}",
                    entry.recipe_id,
                    entry.name,
                    category_label(entry.category),
                    entry.prep_time_minutes,
                    difficulty_label(entry.difficulty),
                    entry.display_rating().unwrap_or_else(|| "-".to_string())
                );
            }
        }
        FavoritesCommand::Toggle { recipe_id } => {
            let toggle = session.favorite_toggle(recipe_id.as_str()).await?;
            toggle.toggle().await?;
            if toggle.is_favorited() {
                println!("Added {} to favorites", recipe_id);
            } else {
                println!("Removed {} from favorites", recipe_id);
            }
        }
        FavoritesCommand::Check { recipe_id } => {
            let favorited = session.favorites().is_favorited(&recipe_id).await?;
            println!("{}", if favorited { "yes" } else { "no" });
        }
    }
    Ok(())
}

/// Read an avatar upload, rejecting oversized files before loading them
async fn read_avatar_file(file: &Path) -> Result<Vec<u8>> {
    let metadata = tokio::fs::metadata(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
    if size > AVATAR_MAX_BYTES {
        return Err(resepku_core::Error::file_too_large(size, AVATAR_MAX_BYTES).into());
    }

    tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))
}

fn guess_mime(file: &Path) -> Result<String> {
    let extension = file
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("png") => Ok("image/png".to_string()),
        Some("jpg" | "jpeg") => Ok("image/jpeg".to_string()),
        _ => anyhow::bail!(
            "Cannot guess the image type of {}. Pass --mime image/png or --mime image/jpeg",
            file.display()
        ),
    }
}

fn category_label(category: Category) -> &'static str {
    match category {
        Category::Food => "makanan",
        Category::Drink => "minuman",
    }
}

fn difficulty_label(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => "easy",
        Difficulty::Medium => "medium",
        Difficulty::Hard => "hard",
    }
}

/// Expand a leading `~/` to the home directory
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = env::var_os("HOME")
    {
        return PathBuf::from(home).join(rest);
    }
    PathBuf::from(path)
}

/// User-facing message for a command error
fn describe(error: &anyhow::Error) -> String {
    match error.downcast_ref::<resepku_core::Error>() {
        Some(e) => e.user_message(),
        None => format!("{:#}", error),
    }
}
