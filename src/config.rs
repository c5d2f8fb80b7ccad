use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const DEFAULT_WORKERS: usize = 3;
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_YTDLP: &str = "yt-dlp";

/// Settings that can be stored in `config.toml`.
///
/// Every field is optional; missing values are filled from the environment
/// or from command-line flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub spotify: SpotifySection,

    #[serde(default)]
    pub youtube: YouTubeSection,

    #[serde(default)]
    pub download: DownloadSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpotifySection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct YouTubeSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookies: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ytdlp_path: Option<PathBuf>,
}

/// Client credentials for the catalog API.
#[derive(Debug, Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Settings for the video search API.
#[derive(Debug, Clone)]
pub struct YouTubeConfig {
    pub api_key: String,
}

impl Config {
    /// Default config file location (`<config dir>/trackgrab/config.toml`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("trackgrab").join("config.toml"))
    }

    /// Load config from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    /// Load the config from `path` if given, otherwise from the default
    /// location.  A missing default file yields an empty config.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(p) = path {
            return Self::load_from(p);
        }
        match Self::default_path() {
            Some(p) if p.exists() => {
                log::debug!("Loading config from {}", p.display());
                Self::load_from(&p)
            }
            _ => Ok(Config::default()),
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("invalid config TOML: {}", e)))
    }

    /// Overlay `SPOTIFY_CLIENT_ID`, `SPOTIFY_CLIENT_SECRET` and
    /// `YOUTUBE_API_KEY` from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary variable lookup.  Empty values are
    /// ignored.
    pub fn apply_vars<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = get("SPOTIFY_CLIENT_ID") {
            self.spotify.client_id = Some(v);
        }
        if let Some(v) = get("SPOTIFY_CLIENT_SECRET") {
            self.spotify.client_secret = Some(v);
        }
        if let Some(v) = get("YOUTUBE_API_KEY") {
            self.youtube.api_key = Some(v);
        }
    }

    pub fn spotify_credentials(&self) -> Result<SpotifyCredentials> {
        match (&self.spotify.client_id, &self.spotify.client_secret) {
            (Some(id), Some(secret)) => Ok(SpotifyCredentials {
                client_id: id.clone(),
                client_secret: secret.clone(),
            }),
            _ => Err(Error::Config(
                "SPOTIFY_CLIENT_ID or SPOTIFY_CLIENT_SECRET not set".to_string(),
            )),
        }
    }

    pub fn youtube_config(&self) -> Result<YouTubeConfig> {
        match &self.youtube.api_key {
            Some(key) => Ok(YouTubeConfig { api_key: key.clone() }),
            None => Err(Error::Config("YOUTUBE_API_KEY not set".to_string())),
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.download
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }

    pub fn workers(&self) -> usize {
        self.download.workers.unwrap_or(DEFAULT_WORKERS).max(1)
    }

    pub fn ytdlp_path(&self) -> PathBuf {
        self.download
            .ytdlp_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_YTDLP))
    }
}

/// Create the output directory if it does not exist yet.
pub fn ensure_output_dir(dir: &Path) -> Result<PathBuf> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        log::info!("Created output directory {}", dir.display());
    }
    Ok(dir.to_path_buf())
}
