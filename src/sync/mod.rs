//! Sync orchestration between the remote service and the local cache.
//!
//! Every page sync ends in a reconciliation of unread/starred state. The
//! remote only exposes those as complete id sets, so both the full and the
//! incremental path replace the local flags wholesale. What differs is how
//! content is refreshed: a full sync re-reads subscriptions and hydrates every
//! entry the state sets mention, while an incremental sync only pulls entries
//! changed since the cursor.

mod reconcile;

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::app::{Result, SyncError};
use crate::domain::{Entry, EntryFilter};
use crate::remote::{RemoteClient, RemoteError, RemoteResult};
use crate::store::{Store, NEVER_SYNCED};

/// Entries returned after a full refresh, larger than a page so the first
/// view is well populated.
pub const DEFAULT_CACHE_FILL_LIMIT: usize = 500;

/// Most ids the remote accepts in one by-id request.
pub const DEFAULT_ID_BATCH_SIZE: usize = 100;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub cache_fill_limit: usize,
    pub id_batch_size: usize,
    /// Deadline applied to each remote call.
    pub request_timeout: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            cache_fill_limit: DEFAULT_CACHE_FILL_LIMIT,
            id_batch_size: DEFAULT_ID_BATCH_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Full,
    Incremental,
}

/// What one page sync did. `mode` is `None` when the page was empty and no
/// reconciliation ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub mode: Option<SyncMode>,
    pub fetched: usize,
    pub updated: usize,
    pub hydrated: usize,
    pub unread: usize,
    pub starred: usize,
}

pub struct SyncEngine<S> {
    store: Arc<S>,
    remote: Arc<dyn RemoteClient + Send + Sync>,
    options: SyncOptions,
    /// Persisted cursor, loaded on first use. `Some(NEVER_SYNCED)` once
    /// loaded from an empty cache.
    last_sync: Mutex<Option<DateTime<Utc>>>,
    /// Held for the whole of a page sync so overlapping calls queue up.
    sync_gate: tokio::sync::Mutex<()>,
}

impl<S: Store + Send + Sync> SyncEngine<S> {
    pub fn new(store: Arc<S>, remote: Arc<dyn RemoteClient + Send + Sync>) -> Self {
        Self::with_options(store, remote, SyncOptions::default())
    }

    pub fn with_options(
        store: Arc<S>,
        remote: Arc<dyn RemoteClient + Send + Sync>,
        options: SyncOptions,
    ) -> Self {
        Self {
            store,
            remote,
            options,
            last_sync: Mutex::new(None),
            sync_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Fetch a page and run a full reconciliation.
    pub async fn refresh(&self, page: u32, per_page: u32) -> Result<Vec<Entry>> {
        self.sync_page(page, per_page, true).await?;
        self.store.list_entries(self.options.cache_fill_limit)
    }

    /// Fetch the next page, reconciling incrementally once a cursor exists.
    /// A fetched count of 0 means there are no more pages.
    pub async fn load_more(
        &self,
        page: u32,
        per_page: u32,
        filter: EntryFilter,
        limit: usize,
    ) -> Result<(Vec<Entry>, usize)> {
        let report = self.sync_page(page, per_page, false).await?;
        let entries = self.store.list_entries_by_filter(limit, filter)?;
        Ok((entries, report.fetched))
    }

    pub fn list_cached(&self, limit: usize) -> Result<Vec<Entry>> {
        self.store.list_entries(limit)
    }

    pub fn list_cached_by_filter(&self, limit: usize, filter: EntryFilter) -> Result<Vec<Entry>> {
        self.store.list_entries_by_filter(limit, filter)
    }

    pub fn search_cached(
        &self,
        limit: usize,
        filter: EntryFilter,
        query: &str,
    ) -> Result<Vec<Entry>> {
        if query.trim().is_empty() {
            return self.store.list_entries_by_filter(limit, filter);
        }
        self.store.search_entries_by_filter(limit, filter, query)
    }

    /// Flip the unread flag remotely, then locally. The cache is only touched
    /// once the remote accepted the change.
    pub async fn toggle_unread(&self, id: i64, current_unread: bool) -> Result<bool> {
        let next = !current_unread;
        if next {
            self.remote_call("mark entry unread", self.remote.mark_entries_unread(&[id]))
                .await?;
        } else {
            self.remote_call("mark entry read", self.remote.mark_entries_read(&[id]))
                .await?;
        }
        self.store.set_entry_unread(id, next)?;
        Ok(next)
    }

    /// Same contract as [`toggle_unread`](Self::toggle_unread) for the star.
    pub async fn toggle_starred(&self, id: i64, current_starred: bool) -> Result<bool> {
        let next = !current_starred;
        if next {
            self.remote_call("star entry", self.remote.star_entries(&[id]))
                .await?;
        } else {
            self.remote_call("unstar entry", self.remote.unstar_entries(&[id]))
                .await?;
        }
        self.store.set_entry_starred(id, next)?;
        Ok(next)
    }

    /// Time of the last successful reconciliation, if any.
    pub fn last_synced_at(&self) -> Result<Option<DateTime<Utc>>> {
        let cursor = self.sync_cursor()?;
        Ok((cursor != NEVER_SYNCED).then_some(cursor))
    }

    /// Fetch one page, save it and reconcile.
    ///
    /// On error the cursor keeps its previous value. Sub-steps that already
    /// committed (for example the page's entries) stay committed.
    pub async fn sync_page(&self, page: u32, per_page: u32, full: bool) -> Result<SyncReport> {
        let _gate = self.sync_gate.lock().await;
        let started = Utc::now();

        let entries = self
            .remote_call("fetch entries page", self.remote.list_entries(page, per_page))
            .await?;
        if entries.is_empty() {
            tracing::debug!("Page {} is empty, nothing to sync", page);
            return Ok(SyncReport::default());
        }

        self.store.save_entries(&entries)?;

        let cursor = self.sync_cursor()?;
        let mode = if full || cursor == NEVER_SYNCED {
            SyncMode::Full
        } else {
            SyncMode::Incremental
        };

        let mut report = SyncReport {
            mode: Some(mode),
            fetched: entries.len(),
            ..SyncReport::default()
        };

        match mode {
            SyncMode::Full => self.full_reconcile(&mut report).await?,
            SyncMode::Incremental => self.incremental_reconcile(cursor, &mut report).await?,
        }

        self.advance_cursor(cursor, started)?;

        tracing::info!(
            "{:?} sync of page {}: {} fetched, {} updated, {} hydrated, {} unread, {} starred",
            mode,
            page,
            report.fetched,
            report.updated,
            report.hydrated,
            report.unread,
            report.starred
        );

        Ok(report)
    }

    fn cursor(&self) -> Result<DateTime<Utc>> {
        let mut last_sync = self.last_sync.lock().unwrap_or_else(PoisonError::into_inner);
        match *last_sync {
            Some(cursor) => Ok(cursor),
            None => {
                let cursor = self.store.get_sync_cursor()?;
                *last_sync = Some(cursor);
                Ok(cursor)
            }
        }
    }

    /// Like [`cursor`](Self::cursor), but an unreadable stored value counts
    /// as never synced. The next successful sync then runs in full and
    /// overwrites it.
    fn sync_cursor(&self) -> Result<DateTime<Utc>> {
        match self.cursor() {
            Err(SyncError::Decode(reason)) => {
                tracing::warn!("Ignoring unreadable sync cursor: {}", reason);
                Ok(NEVER_SYNCED)
            }
            other => other,
        }
    }

    /// Persist the sync start time as the new cursor. Never moves backwards.
    fn advance_cursor(&self, previous: DateTime<Utc>, started: DateTime<Utc>) -> Result<()> {
        let next = started.max(previous);
        self.store.set_sync_cursor(next)?;
        *self.last_sync.lock().unwrap_or_else(PoisonError::into_inner) = Some(next);
        Ok(())
    }

    async fn remote_call<T, F>(&self, stage: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = RemoteResult<T>>,
    {
        match tokio::time::timeout(self.options.request_timeout, call).await {
            Ok(result) => result.map_err(|e| SyncError::remote(stage, e)),
            Err(_) => Err(SyncError::remote(
                stage,
                RemoteError::Timeout(self.options.request_timeout),
            )),
        }
    }
}
