//! JSON payloads of the Feedbin v2 API and their conversion into domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Entry, Feed, Tagging};

#[derive(Debug, Clone, Deserialize)]
pub struct WireEntry {
    pub id: i64,
    pub feed_id: i64,
    pub title: Option<String>,
    pub url: Option<String>,
    pub author: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub published: DateTime<Utc>,
}

impl WireEntry {
    pub fn into_entry(self, fetched_at: DateTime<Utc>) -> Entry {
        let mut entry = Entry::new(
            self.id,
            self.feed_id,
            self.url.unwrap_or_default(),
            self.published,
        );
        entry.title = self.title;
        entry.author = self.author;
        entry.summary = self.summary;
        entry.content = self.content;
        entry.fetched_at = fetched_at;
        entry
    }
}

/// A subscription row. The cache keys feeds by `feed_id`, which is what
/// entries reference; the subscription's own id is not kept.
#[derive(Debug, Clone, Deserialize)]
pub struct WireSubscription {
    pub feed_id: i64,
    #[serde(default)]
    pub title: Option<String>,
    pub feed_url: String,
    #[serde(default)]
    pub site_url: Option<String>,
}

impl From<WireSubscription> for Feed {
    fn from(sub: WireSubscription) -> Self {
        Feed::new(
            sub.feed_id,
            sub.title.unwrap_or_default(),
            sub.feed_url,
            sub.site_url.unwrap_or_default(),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireTagging {
    pub feed_id: i64,
    pub name: String,
}

impl From<WireTagging> for Tagging {
    fn from(t: WireTagging) -> Self {
        Tagging {
            feed_id: t.feed_id,
            name: t.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UnreadEntriesBody<'a> {
    pub unread_entries: &'a [i64],
}

#[derive(Debug, Serialize)]
pub struct StarredEntriesBody<'a> {
    pub starred_entries: &'a [i64],
}
