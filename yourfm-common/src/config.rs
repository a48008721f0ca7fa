//! Bootstrap configuration and root folder resolution
//!
//! Two tiers of configuration are involved in starting a YourFM service:
//!
//! 1. **TOML bootstrap**: port, data locations, logging, upstream credentials
//!    and mixer tuning. Read once at startup.
//! 2. **Environment**: credentials and URLs that deployments inject without
//!    touching the TOML file. Environment values win over TOML values.
//!
//! Command-line arguments (parsed by each binary) override both.
//! A missing TOML file is not an error: defaults are used and a warning logged.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the root folder (database, logs)
pub const ROOT_FOLDER_ENV: &str = "YOURFM_ROOT_FOLDER";

/// Default HTTP port for the station service
pub const DEFAULT_PORT: u16 = 8001;

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "yourfm.db";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Root folder for the database and other service data
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Explicit database path (defaults to `<root_folder>/yourfm.db`)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Frontend URL used for the OAuth redirect back to the client
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,

    /// Allowed CORS origins ("*" allows any)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Spotify Web API credentials and endpoints
    #[serde(default)]
    pub spotify: SpotifyConfig,

    /// ElevenLabs speech synthesis
    #[serde(default)]
    pub elevenlabs: ElevenLabsConfig,

    /// Gemini text generation
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// SoundStat track analysis
    #[serde(default)]
    pub soundstat: SoundStatConfig,

    /// Discovery mixer tuning
    #[serde(default)]
    pub mixer: MixerConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            root_folder: None,
            database_path: None,
            frontend_url: default_frontend_url(),
            cors_origins: default_cors_origins(),
            logging: LoggingConfig::default(),
            spotify: SpotifyConfig::default(),
            elevenlabs: ElevenLabsConfig::default(),
            gemini: GeminiConfig::default(),
            soundstat: SoundStatConfig::default(),
            mixer: MixerConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level or full filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Spotify Web API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpotifyConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default = "default_spotify_api_base")]
    pub api_base_url: String,
    #[serde(default = "default_spotify_accounts_base")]
    pub accounts_base_url: String,
    /// Market used for top-track lookups
    #[serde(default = "default_market")]
    pub market: String,
    /// Minimum spacing between two Web API requests from one client
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,
}

impl SpotifyConfig {
    /// Both halves of the client credentials are present
    pub fn is_configured(&self) -> bool {
        self.client_id.as_deref().is_some_and(is_valid_value)
            && self.client_secret.as_deref().is_some_and(is_valid_value)
    }
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            api_base_url: default_spotify_api_base(),
            accounts_base_url: default_spotify_accounts_base(),
            market: default_market(),
            min_request_interval_ms: default_min_request_interval_ms(),
        }
    }
}

/// ElevenLabs configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ElevenLabsConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_elevenlabs_base")]
    pub base_url: String,
    #[serde(default = "default_elevenlabs_model")]
    pub model_id: String,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_elevenlabs_base(),
            model_id: default_elevenlabs_model(),
        }
    }
}

/// Gemini configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_gemini_base")]
    pub base_url: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_gemini_base(),
            model: default_gemini_model(),
        }
    }
}

/// SoundStat configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SoundStatConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_soundstat_base")]
    pub base_url: String,
    /// Per-request timeout for the search and track lookups
    #[serde(default = "default_soundstat_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SoundStatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_soundstat_base(),
            timeout_secs: default_soundstat_timeout_secs(),
        }
    }
}

/// Discovery mixer tuning
///
/// Every value has a built-in default; a TOML `[mixer]` table only needs the
/// keys it wants to change.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MixerConfig {
    /// Final playlist length
    pub target_total: usize,
    /// Share of the playlist reserved for discovery tracks
    pub discovery_ratio: f64,
    /// Discovery tracks emitted before each selected-artist track
    pub interleave_run: usize,
    /// Seed artists consulted per request
    pub max_seed_artists: usize,
    /// Tracks kept per seed artist
    pub tracks_per_seed_artist: usize,
    /// Target genres searched per request
    pub max_target_genres: usize,
    /// Artist search page size per genre
    pub artists_per_genre: usize,
    /// Track search page size per genre (fallback search)
    pub tracks_per_genre_search: usize,
    /// Tracks kept per accepted discovery artist
    pub tracks_per_discovery_artist: usize,
    /// Discovery pool cap
    pub discovery_limit: usize,
    /// Per-call upstream timeout
    pub per_call_timeout_ms: u64,
    /// Concurrent upstream fetches per request
    pub max_concurrent_fetches: usize,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            target_total: 50,
            discovery_ratio: 0.80,
            interleave_run: 4,
            max_seed_artists: 10,
            tracks_per_seed_artist: 5,
            max_target_genres: 6,
            artists_per_genre: 20,
            tracks_per_genre_search: 20,
            tracks_per_discovery_artist: 6,
            discovery_limit: 200,
            per_call_timeout_ms: 4000,
            max_concurrent_fetches: 4,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_frontend_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_spotify_api_base() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_spotify_accounts_base() -> String {
    "https://accounts.spotify.com".to_string()
}

fn default_market() -> String {
    "US".to_string()
}

fn default_min_request_interval_ms() -> u64 {
    50
}

fn default_elevenlabs_base() -> String {
    "https://api.elevenlabs.io/v1".to_string()
}

fn default_elevenlabs_model() -> String {
    "eleven_turbo_v2_5".to_string()
}

fn default_gemini_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_soundstat_base() -> String {
    "https://soundstat.info/api/v1".to_string()
}

fn default_soundstat_timeout_secs() -> u64 {
    10
}

/// Non-empty, non-whitespace configuration value
pub fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Read an environment variable, treating empty values as unset
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| is_valid_value(v))
}

impl TomlConfig {
    /// Load TOML configuration from `path`
    ///
    /// A missing file yields defaults with a warning; an unreadable or
    /// malformed file is a configuration error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
        let config: TomlConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;

        info!("Loaded TOML configuration from {}", path.display());
        Ok(config)
    }

    /// Load from the platform default location, or defaults if there is none
    pub fn load_default() -> Result<Self> {
        match default_config_path() {
            Some(path) => Self::load(&path),
            None => {
                warn!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Overlay credentials and URLs from the environment
    ///
    /// Environment wins over TOML; empty variables are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_value("SPOTIFY_CLIENT_ID") {
            self.spotify.client_id = Some(v);
        }
        if let Some(v) = env_value("SPOTIFY_CLIENT_SECRET") {
            self.spotify.client_secret = Some(v);
        }
        if let Some(v) = env_value("SPOTIFY_REDIRECT_URI") {
            self.spotify.redirect_uri = Some(v);
        }
        if let Some(v) = env_value("ELEVEN_API_KEY") {
            self.elevenlabs.api_key = Some(v);
        }
        if let Some(v) = env_value("GEMINI_API_KEY") {
            self.gemini.api_key = Some(v);
        }
        if let Some(v) = env_value("SOUNDSTAT_API_KEY") {
            self.soundstat.api_key = Some(v);
        }
        if let Some(v) = env_value("FRONTEND_URL") {
            self.frontend_url = v;
        }
        if let Some(v) = env_value("CORS_ORIGINS") {
            self.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
    }

    /// Database location: explicit `database_path`, else inside the root folder
    pub fn database_path(&self, root_folder: &Path) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| root_folder.join(DATABASE_FILE_NAME))
    }
}

/// Platform config file location
///
/// Linux checks `~/.config/yourfm/config.toml` then `/etc/yourfm/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("yourfm").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/yourfm/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. `YOURFM_ROOT_FOLDER` environment variable
/// 3. TOML `root_folder`
/// 4. OS-dependent default
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_value: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Some(path) = env_value(ROOT_FOLDER_ENV) {
        return PathBuf::from(path);
    }

    if let Some(path) = toml_value {
        return path.to_path_buf();
    }

    default_root_folder()
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("yourfm"))
        .unwrap_or_else(|| PathBuf::from("./yourfm_data"))
}

/// Create the root folder if it does not exist yet
pub fn ensure_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
        info!("Created root folder: {}", path.display());
    }
    Ok(())
}
