#[cfg(test)]
pub mod fake;
pub mod http;
pub mod wire;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{Entry, Feed, Tagging};

pub use http::HttpRemote;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned {status}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("malformed payload from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("{0}")]
    Other(String),
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Read and mutate operations of the feed aggregation service.
///
/// Entries returned by the read calls carry no unread/starred state; that
/// state only ever comes from the id-set endpoints.
#[async_trait]
pub trait RemoteClient {
    async fn list_entries(&self, page: u32, per_page: u32) -> RemoteResult<Vec<Entry>>;
    async fn list_entries_by_ids(&self, ids: &[i64]) -> RemoteResult<Vec<Entry>>;
    async fn list_subscriptions(&self) -> RemoteResult<Vec<Feed>>;
    async fn list_taggings(&self) -> RemoteResult<Vec<Tagging>>;
    async fn list_unread_entry_ids(&self) -> RemoteResult<Vec<i64>>;
    async fn list_starred_entry_ids(&self) -> RemoteResult<Vec<i64>>;
    async fn list_updated_entry_ids_since(&self, since: DateTime<Utc>) -> RemoteResult<Vec<i64>>;

    async fn mark_entries_read(&self, ids: &[i64]) -> RemoteResult<()>;
    async fn mark_entries_unread(&self, ids: &[i64]) -> RemoteResult<()>;
    async fn star_entries(&self, ids: &[i64]) -> RemoteResult<()>;
    async fn unstar_entries(&self, ids: &[i64]) -> RemoteResult<()>;
}
