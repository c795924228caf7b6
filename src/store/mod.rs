pub mod migrations;
pub mod search;
pub mod sqlite;

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::app::Result;
use crate::domain::{Entry, EntryFilter, Feed};

pub use search::SearchMode;
pub use sqlite::SqliteStore;

/// AppState key holding the last successful reconciliation time.
pub const SYNC_CURSOR_KEY: &str = "sync_cursor";

/// Cursor value reported when no sync has ever completed.
pub const NEVER_SYNCED: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

pub trait Store {
    // Feed operations
    fn save_subscriptions(&self, feeds: &[Feed]) -> Result<()>;
    fn list_feeds(&self) -> Result<Vec<Feed>>;

    // Entry operations
    fn save_entries(&self, entries: &[Entry]) -> Result<()>;
    fn get_entry(&self, id: i64) -> Result<Option<Entry>>;
    fn cached_entry_ids(&self, ids: &[i64]) -> Result<HashSet<i64>>;
    fn list_entries(&self, limit: usize) -> Result<Vec<Entry>>;
    fn list_entries_by_filter(&self, limit: usize, filter: EntryFilter) -> Result<Vec<Entry>>;
    fn search_entries_by_filter(
        &self,
        limit: usize,
        filter: EntryFilter,
        query: &str,
    ) -> Result<Vec<Entry>>;

    // State operations
    fn save_entry_states(&self, unread_ids: &[i64], starred_ids: &[i64]) -> Result<()>;
    fn set_entry_unread(&self, id: i64, unread: bool) -> Result<()>;
    fn set_entry_starred(&self, id: i64, starred: bool) -> Result<()>;

    // App state
    fn get_app_state(&self, key: &str) -> Result<Option<String>>;
    fn set_app_state(&self, key: &str, value: &str) -> Result<()>;
    fn get_sync_cursor(&self) -> Result<DateTime<Utc>>;
    fn set_sync_cursor(&self, cursor: DateTime<Utc>) -> Result<()>;
}
