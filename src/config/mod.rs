//! Configuration management for feedsync.
//!
//! Configuration is read from `~/.config/feedsync/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.
//! Credentials may also come from `FEEDSYNC_USERNAME` / `FEEDSYNC_PASSWORD`,
//! which take precedence over the file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::remote::http::DEFAULT_BASE_URL;
use crate::store::SearchMode;
use crate::sync::{SyncOptions, DEFAULT_CACHE_FILL_LIMIT, DEFAULT_ID_BATCH_SIZE};

pub const USERNAME_ENV: &str = "FEEDSYNC_USERNAME";
pub const PASSWORD_ENV: &str = "FEEDSYNC_PASSWORD";

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub store: StoreConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            username: String::new(),
            password: String::new(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Cache database location; the platform data dir when unset.
    pub db_path: Option<PathBuf>,
    pub search: SearchMode,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub per_page: u32,
    pub cache_fill_limit: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            per_page: 100,
            cache_fill_limit: DEFAULT_CACHE_FILL_LIMIT,
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(username) = var(USERNAME_ENV) {
            self.remote.username = username;
        }
        if let Some(password) = var(PASSWORD_ENV) {
            self.remote.password = password;
        }
    }

    /// Get the default config file path: `~/.config/feedsync/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("feedsync").join("config.toml"))
    }

    /// Resolved cache path: the configured one, or `<data dir>/feedsync/cache.db`.
    pub fn db_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.store.db_path {
            Some(path) => Ok(path.clone()),
            None => {
                let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
                Ok(data_dir.join("feedsync").join("cache.db"))
            }
        }
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            cache_fill_limit: self.sync.cache_fill_limit,
            id_batch_size: DEFAULT_ID_BATCH_SIZE,
            request_timeout: Duration::from_secs(self.remote.timeout_secs),
        }
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# feedsync configuration

[remote]
# Feedbin-compatible API root
base_url = "https://api.feedbin.com/v2/"

# Credentials; FEEDSYNC_USERNAME / FEEDSYNC_PASSWORD override these
username = ""
password = ""

# Deadline for each remote request, in seconds
timeout_secs = 30

[store]
# Cache database path (default: <data dir>/feedsync/cache.db)
# db_path = "/path/to/cache.db"

# Search backend: "substring" (always available) or "indexed" (SQLite FTS5,
# falls back to substring if the index cannot be used)
search = "substring"

[sync]
# Entries requested per page
per_page = 100

# Entries returned after a full refresh
cache_fill_limit = 500
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        assert_eq!(config.remote.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.store.search, SearchMode::Substring);
        assert_eq!(config.sync.per_page, 100);
        assert_eq!(config.store.db_path, None);
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[store]
search = "indexed"
db_path = "/tmp/feedsync-test.db"
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(config.store.search, SearchMode::Indexed);
        assert_eq!(
            config.db_path().unwrap(),
            PathBuf::from("/tmp/feedsync-test.db")
        );
        assert_eq!(config.remote.timeout_secs, 30);
        assert_eq!(config.sync.cache_fill_limit, DEFAULT_CACHE_FILL_LIMIT);
    }

    #[test]
    fn test_unknown_search_mode_rejected() {
        let content = "[store]\nsearch = \"regex\"\n";
        assert!(toml::from_str::<Config>(content).is_err());
    }

    #[test]
    fn test_env_overrides_credentials() {
        let mut config = Config::default();
        config.remote.username = "file-user".into();
        config.apply_env(|key| match key {
            USERNAME_ENV => Some("env-user".into()),
            _ => None,
        });

        assert_eq!(config.remote.username, "env-user");
        assert_eq!(config.remote.password, "");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[remote]\ntimeout_secs = 5\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.sync_options().request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_load_from_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[sync\nper_page = ").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
