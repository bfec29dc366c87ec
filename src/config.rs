use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::eyre::{Context, OptionExt, Result};
use serde::{Deserialize, Serialize};

use crate::ports::target::Visibility;
use crate::services::jobs::executor::TransferSettings;
use crate::spotify_rs::catalog::SpotifySettings;

const APP_DIR: &str = "playlist-bridge";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where credentials are persisted. Defaults to the user data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    credentials_file: Option<String>,
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub auto_sync: AutoSyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default = "default_market")]
    pub market: String,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            market: default_market(),
        }
    }
}

fn default_market() -> String {
    "IN".to_string()
}

/// How playlists are created on the target catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferConfig {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub visibility: Visibility,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoSyncConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for AutoSyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    120
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .wrap_err_with(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join(APP_DIR).join("config.toml"))
    }

    /// Load the default config file, or built-in defaults when there is none
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Write the default config to the default path unless a file is already there
    pub fn create_default() -> Result<PathBuf> {
        let path = Self::config_path().ok_or_eyre("No config directory on this platform")?;
        if path.exists() {
            tracing::info!("Config already exists at {}", path.display());
            return Ok(path);
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).wrap_err("Failed to create config directory")?;
        }
        let contents = toml::to_string_pretty(&Self::default())?;
        std::fs::write(&path, contents)
            .wrap_err_with(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(path)
    }

    /// Expand ~ to home directory
    fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    pub fn credentials_path(&self) -> Result<PathBuf> {
        match &self.credentials_file {
            Some(path) => Ok(Self::expand_path(path)),
            None => dirs::data_dir()
                .map(|dir| dir.join(APP_DIR).join("tokens.json"))
                .ok_or_eyre("No data directory on this platform, set credentials_file"),
        }
    }

    /// Spotify app credentials, falling back to `SPOTIFY_CLIENT_ID` and
    /// `SPOTIFY_CLIENT_SECRET`
    pub fn spotify_settings(&self) -> Result<SpotifySettings> {
        self.spotify_settings_with(|name| std::env::var(name).ok())
    }

    fn spotify_settings_with(&self, env: impl Fn(&str) -> Option<String>) -> Result<SpotifySettings> {
        let client_id = self
            .spotify
            .client_id
            .clone()
            .or_else(|| env("SPOTIFY_CLIENT_ID"))
            .ok_or_eyre("Spotify client id is not configured")?;
        let client_secret = self
            .spotify
            .client_secret
            .clone()
            .or_else(|| env("SPOTIFY_CLIENT_SECRET"))
            .ok_or_eyre("Spotify client secret is not configured")?;

        Ok(SpotifySettings {
            client_id,
            client_secret,
            market: self.spotify.market.clone(),
        })
    }

    pub fn transfer_settings(&self) -> TransferSettings {
        TransferSettings {
            description: self.transfer.description.clone(),
            visibility: self.transfer.visibility,
        }
    }

    pub fn auto_sync_interval(&self) -> Duration {
        Duration::from_secs(self.auto_sync.interval_secs.max(1))
    }
}
