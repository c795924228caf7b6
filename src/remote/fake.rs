//! In-memory [`RemoteClient`] for tests, with per-operation failure injection.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::domain::{Entry, Feed, Tagging};
use crate::remote::{RemoteClient, RemoteError, RemoteResult};

#[derive(Default)]
pub struct FakeState {
    pub pages: HashMap<u32, Vec<Entry>>,
    pub entries: HashMap<i64, Entry>,
    pub subscriptions: Vec<Feed>,
    pub taggings: Vec<Tagging>,
    pub unread: Vec<i64>,
    pub starred: Vec<i64>,
    pub updated: Vec<i64>,
    pub failing: HashSet<&'static str>,
    pub delays: HashMap<&'static str, Duration>,
    pub calls: Vec<&'static str>,
    pub by_ids_requests: Vec<Vec<i64>>,
    pub since: Vec<DateTime<Utc>>,
}

#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<FakeState>,
}

pub fn remote_entry(id: i64, feed_id: i64, day: u32) -> Entry {
    let mut entry = Entry::new(
        id,
        feed_id,
        format!("https://example.com/{}", id),
        Utc.with_ymd_and_hms(2024, 5, day, 8, 0, 0).unwrap(),
    );
    entry.title = Some(format!("Entry {}", id));
    entry
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    /// Put entries on a page and make them fetchable by id.
    pub fn set_page(&self, page: u32, entries: Vec<Entry>) {
        self.with(|s| {
            for entry in &entries {
                s.entries.insert(entry.id, entry.clone());
            }
            s.pages.insert(page, entries);
        });
    }

    /// Make entries fetchable by id without putting them on any page.
    pub fn add_entries(&self, entries: Vec<Entry>) {
        self.with(|s| {
            for entry in entries {
                s.entries.insert(entry.id, entry);
            }
        });
    }

    pub fn fail(&self, op: &'static str) {
        self.with(|s| {
            s.failing.insert(op);
        });
    }

    pub fn delay(&self, op: &'static str, by: Duration) {
        self.with(|s| {
            s.delays.insert(op, by);
        });
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.with(|s| s.calls.clone())
    }

    pub fn called(&self, op: &str) -> bool {
        self.with(|s| s.calls.iter().any(|c| *c == op))
    }

    async fn enter(&self, op: &'static str) -> RemoteResult<()> {
        let delay = self.with(|s| {
            s.calls.push(op);
            s.delays.get(op).copied()
        });
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.with(|s| s.failing.contains(op)) {
            return Err(RemoteError::Other(format!("{} unavailable", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteClient for FakeRemote {
    async fn list_entries(&self, page: u32, _per_page: u32) -> RemoteResult<Vec<Entry>> {
        self.enter("list_entries").await?;
        Ok(self.with(|s| s.pages.get(&page).cloned().unwrap_or_default()))
    }

    async fn list_entries_by_ids(&self, ids: &[i64]) -> RemoteResult<Vec<Entry>> {
        self.enter("list_entries_by_ids").await?;
        Ok(self.with(|s| {
            s.by_ids_requests.push(ids.to_vec());
            ids.iter().filter_map(|id| s.entries.get(id).cloned()).collect()
        }))
    }

    async fn list_subscriptions(&self) -> RemoteResult<Vec<Feed>> {
        self.enter("list_subscriptions").await?;
        Ok(self.with(|s| s.subscriptions.clone()))
    }

    async fn list_taggings(&self) -> RemoteResult<Vec<Tagging>> {
        self.enter("list_taggings").await?;
        Ok(self.with(|s| s.taggings.clone()))
    }

    async fn list_unread_entry_ids(&self) -> RemoteResult<Vec<i64>> {
        self.enter("list_unread_entry_ids").await?;
        Ok(self.with(|s| s.unread.clone()))
    }

    async fn list_starred_entry_ids(&self) -> RemoteResult<Vec<i64>> {
        self.enter("list_starred_entry_ids").await?;
        Ok(self.with(|s| s.starred.clone()))
    }

    async fn list_updated_entry_ids_since(&self, since: DateTime<Utc>) -> RemoteResult<Vec<i64>> {
        self.enter("list_updated_entry_ids_since").await?;
        Ok(self.with(|s| {
            s.since.push(since);
            s.updated.clone()
        }))
    }

    async fn mark_entries_read(&self, ids: &[i64]) -> RemoteResult<()> {
        self.enter("mark_entries_read").await?;
        self.with(|s| s.unread.retain(|id| !ids.contains(id)));
        Ok(())
    }

    async fn mark_entries_unread(&self, ids: &[i64]) -> RemoteResult<()> {
        self.enter("mark_entries_unread").await?;
        self.with(|s| s.unread.extend_from_slice(ids));
        Ok(())
    }

    async fn star_entries(&self, ids: &[i64]) -> RemoteResult<()> {
        self.enter("star_entries").await?;
        self.with(|s| s.starred.extend_from_slice(ids));
        Ok(())
    }

    async fn unstar_entries(&self, ids: &[i64]) -> RemoteResult<()> {
        self.enter("unstar_entries").await?;
        self.with(|s| s.starred.retain(|id| !ids.contains(id)));
        Ok(())
    }
}
