use thiserror::Error;

use crate::config::ConfigError;
use crate::remote::RemoteError;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("{stage}: {source}")]
    RemoteFetch {
        stage: &'static str,
        #[source]
        source: RemoteError,
    },

    #[error("{stage}: {source}")]
    CacheWrite {
        stage: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{stage}: {source}")]
    CacheRead {
        stage: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid argument: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    pub fn remote(stage: &'static str, source: RemoteError) -> Self {
        match source {
            RemoteError::Decode { url, source } => {
                SyncError::Decode(format!("{}: {}: {}", stage, url, source))
            }
            source => SyncError::RemoteFetch { stage, source },
        }
    }

    pub fn write(stage: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| SyncError::CacheWrite { stage, source }
    }

    pub fn read(stage: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| SyncError::CacheRead { stage, source }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
