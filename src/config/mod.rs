use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::errors::{AppError, AppResult};

pub mod defaults;
pub mod duration_serde;

use defaults::*;

/// Top-level configuration shared by both batch jobs
///
/// Layered as: built-in defaults, then the TOML file, then `EPG_UNIFIER_*`
/// environment variables. Credentials never come from the file; they are read
/// from `USERNAME` / `PASSWORD` after extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Location of the unified guide (written by merge, read by find-missing)
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub playlist: PlaylistConfig,
    #[serde(default)]
    pub gaps: GapFinderConfig,
    #[serde(skip)]
    pub credentials: Option<Credentials>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// gzip-compressed XMLTV fragments, merged in this order
    #[serde(default = "default_guide_sources")]
    pub sources: Vec<String>,
    /// Value of the `generator-info-name` attribute on the unified root
    #[serde(default = "default_generator_name")]
    pub generator_name: String,
    /// Directory holding the downloaded chunk files until cleanup
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    #[serde(default = "default_fragment_timeout", with = "duration_serde::duration")]
    pub fragment_timeout: Duration,
    #[serde(default = "default_merge_playlist_timeout", with = "duration_serde::duration")]
    pub playlist_timeout: Duration,
    #[serde(default = "default_merge_endpoint")]
    pub playlist_endpoint: PlaylistEndpoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistConfig {
    /// Provider base URL; credentials are appended as query parameters
    #[serde(default = "default_playlist_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapFinderConfig {
    /// Forward window, in days, a channel needs at least one programme in
    #[serde(default = "default_days_ahead")]
    pub horizon_days: u32,
    /// Size of the busiest-channel table printed when nothing is missing
    #[serde(default = "default_top_channels")]
    pub top_channels: usize,
    #[serde(default = "default_gaps_playlist_timeout", with = "duration_serde::duration")]
    pub playlist_timeout: Duration,
    #[serde(default = "default_gaps_endpoint")]
    pub playlist_endpoint: PlaylistEndpoint,
}

/// Which provider endpoint serves the playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaylistEndpoint {
    /// `get.php?username=..&password=..&type=m3u_plus`
    M3uPlus,
    /// `xmltv.php?username=..&password=..`
    Xmltv,
}

/// Provider credentials, sourced from the process environment
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"****")
            .finish()
    }
}

impl Credentials {
    /// Read `USERNAME` and `PASSWORD` from the environment
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build credentials from an arbitrary variable lookup.
    ///
    /// Both values must be present and non-empty.
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let username = lookup(USERNAME_ENV).filter(|v| !v.is_empty())?;
        let password = lookup(PASSWORD_ENV).filter(|v| !v.is_empty())?;
        Some(Self { username, password })
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_PATH)
}

fn default_guide_sources() -> Vec<String> {
    DEFAULT_GUIDE_SOURCES.iter().map(|s| s.to_string()).collect()
}

fn default_generator_name() -> String {
    DEFAULT_GENERATOR_NAME.to_string()
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(DEFAULT_WORK_DIR)
}

fn parse_default_duration(value: &str) -> Duration {
    humantime::parse_duration(value).unwrap_or(Duration::from_secs(30))
}

fn default_fragment_timeout() -> Duration {
    parse_default_duration(DEFAULT_FRAGMENT_TIMEOUT)
}

fn default_merge_playlist_timeout() -> Duration {
    parse_default_duration(DEFAULT_MERGE_PLAYLIST_TIMEOUT)
}

fn default_gaps_playlist_timeout() -> Duration {
    parse_default_duration(DEFAULT_GAPS_PLAYLIST_TIMEOUT)
}

fn default_merge_endpoint() -> PlaylistEndpoint {
    PlaylistEndpoint::M3uPlus
}

fn default_gaps_endpoint() -> PlaylistEndpoint {
    PlaylistEndpoint::Xmltv
}

fn default_playlist_base_url() -> String {
    DEFAULT_PLAYLIST_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_PLAYLIST_USER_AGENT.to_string()
}

fn default_days_ahead() -> u32 {
    DEFAULT_DAYS_AHEAD
}

fn default_top_channels() -> usize {
    DEFAULT_TOP_CHANNELS
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            sources: default_guide_sources(),
            generator_name: default_generator_name(),
            work_dir: default_work_dir(),
            fragment_timeout: default_fragment_timeout(),
            playlist_timeout: default_merge_playlist_timeout(),
            playlist_endpoint: default_merge_endpoint(),
        }
    }
}

impl Default for PlaylistConfig {
    fn default() -> Self {
        Self {
            base_url: default_playlist_base_url(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for GapFinderConfig {
    fn default() -> Self {
        Self {
            horizon_days: default_days_ahead(),
            top_channels: default_top_channels(),
            playlist_timeout: default_gaps_playlist_timeout(),
            playlist_endpoint: default_gaps_endpoint(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            merge: MergeConfig::default(),
            playlist: PlaylistConfig::default(),
            gaps: GapFinderConfig::default(),
            credentials: None,
        }
    }
}

impl Config {
    /// The layered figment used by [`Config::load`]
    pub fn figment(config_file: &Path) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load configuration and pick up credentials from the environment
    pub fn load(config_file: &Path) -> AppResult<Self> {
        let mut config = Self::from_figment(Self::figment(config_file))?;
        if config_file.exists() {
            info!("Configuration loaded from: {}", config_file.display());
        } else {
            debug!(
                "No configuration file at {}, using defaults",
                config_file.display()
            );
        }
        config.credentials = Credentials::from_env();
        Ok(config)
    }

    /// Extract a configuration from an already assembled figment
    pub fn from_figment(figment: Figment) -> AppResult<Self> {
        figment
            .extract()
            .map_err(|e| AppError::configuration(format!("Invalid configuration: {e}")))
    }

    /// Credentials, or a configuration error naming the missing variables
    pub fn require_credentials(&self) -> AppResult<&Credentials> {
        self.credentials.as_ref().ok_or_else(|| {
            AppError::configuration(format!(
                "{USERNAME_ENV} or {PASSWORD_ENV} environment variables were not provided"
            ))
        })
    }

    /// Builder-style helper to attach credentials
    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }
}
