//! Persistent configuration model and file-backed manager.

use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use youtrack_api::models::null_as_default;
use youtrack_api::normalize_base_url;

use crate::error::{AppError, Result};
use crate::storage;

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const TICKETS_FILE_NAME: &str = "tickets.json";
pub const LOG_FILE_NAME: &str = "app.log";

/// Default log verbosity.
fn default_log_level() -> String {
    "info".to_string()
}

/// Represents the configuration persisted on disk: server, tracked projects,
/// window placement hint, last successful sync and logging preferences.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    #[serde(deserialize_with = "null_as_default")]
    pub base_url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub projects: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub window_pos: String,
    /// Epoch seconds of the last successful sync, 0 = never.
    pub last_sync_time: i64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub log_to_file: bool,
}

impl Default for Config {
    /// Returns baseline config when no persisted settings are available.
    fn default() -> Self {
        Self {
            base_url: String::new(),
            projects: Vec::new(),
            window_pos: String::new(),
            last_sync_time: 0,
            log_level: default_log_level(),
            log_to_file: false,
        }
    }
}

impl Config {
    /// Trims the base URL and project keys, strips one trailing slash and
    /// drops blank or repeated project keys (first occurrence wins).
    pub fn normalized(mut self) -> Self {
        self.base_url = normalize_base_url(&self.base_url);

        let mut projects: Vec<String> = Vec::with_capacity(self.projects.len());
        for key in self.projects.iter().map(|key| key.trim()) {
            if !key.is_empty() && !projects.iter().any(|seen| seen == key) {
                projects.push(key.to_string());
            }
        }
        self.projects = projects;

        let level = self.log_level.trim().to_lowercase();
        self.log_level = if level.is_empty() { default_log_level() } else { level };
        self
    }

    /// Server and project scope are present. Credential presence is checked
    /// separately by [`Config::is_configured`].
    pub fn has_scope(&self) -> bool {
        !self.base_url.trim().is_empty() && self.projects.iter().any(|key| !key.trim().is_empty())
    }

    pub fn is_configured(&self, token: Option<&str>) -> bool {
        self.has_scope() && token.is_some_and(|token| !token.trim().is_empty())
    }
}

/// Locations of the files owned by the engine, all in one per-user directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub config_file: PathBuf,
    pub tickets_file: PathBuf,
    pub log_file: PathBuf,
}

impl AppPaths {
    /// Resolves the platform-specific application data directory.
    pub fn resolve() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("dev", "youtrack-helper", "youtrack-helper")
            .ok_or(AppError::NoDataDir)?;
        Ok(Self::in_dir(dirs.data_dir()))
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let data_dir = dir.as_ref().to_path_buf();
        Self {
            config_file: data_dir.join(CONFIG_FILE_NAME),
            tickets_file: data_dir.join(TICKETS_FILE_NAME),
            log_file: data_dir.join(LOG_FILE_NAME),
            data_dir,
        }
    }
}

/// Manages loading and saving of the configuration JSON file.
#[derive(Clone, Debug)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads config from disk, falling back to defaults on read/parse errors.
    pub fn load(&self) -> Config {
        let config = storage::load_json::<Config>(&self.path, "configuration").unwrap_or_default();
        debug!(
            "Config loaded from {}; base_url empty={}, projects={}, log_level={}, log_to_file={}",
            self.path.display(),
            config.base_url.is_empty(),
            config.projects.len(),
            config.log_level,
            config.log_to_file
        );
        config
    }

    /// Persists config atomically, creating the owner-only directory when needed.
    pub fn save(&self, config: &Config) -> Result<()> {
        storage::save_json(&self.path, config)
    }
}
