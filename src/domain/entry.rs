use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cached feed entry.
///
/// `feed_title` and `feed_folder` are joined in from the feeds table at query
/// time and are ignored when the entry is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    pub feed_id: i64,
    pub title: Option<String>,
    pub url: String,
    pub author: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub published_at: DateTime<Utc>,
    pub fetched_at: DateTime<Utc>,
    pub is_unread: bool,
    pub is_starred: bool,
    pub feed_title: Option<String>,
    pub feed_folder: Option<String>,
}

impl Entry {
    pub fn new(id: i64, feed_id: i64, url: String, published_at: DateTime<Utc>) -> Self {
        Self {
            id,
            feed_id,
            title: None,
            url,
            author: None,
            summary: None,
            content: None,
            published_at,
            fetched_at: Utc::now(),
            is_unread: false,
            is_starred: false,
            feed_title: None,
            feed_folder: None,
        }
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(Untitled)")
    }

    /// Get the best available content for display
    pub fn display_content(&self) -> &str {
        self.content
            .as_deref()
            .or(self.summary.as_deref())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> Entry {
        Entry::new(1, 10, "https://example.com/a".into(), Utc::now())
    }

    #[test]
    fn test_new_entry_has_no_state() {
        let entry = entry();
        assert!(!entry.is_unread);
        assert!(!entry.is_starred);
        assert!(entry.feed_title.is_none());
    }

    #[test]
    fn test_display_title_without_title() {
        assert_eq!(entry().display_title(), "(Untitled)");
    }

    #[test]
    fn test_display_content_prefers_content() {
        let mut entry = entry();
        entry.content = Some("Full content".into());
        entry.summary = Some("Short summary".into());
        assert_eq!(entry.display_content(), "Full content");
    }

    #[test]
    fn test_display_content_falls_back_to_summary() {
        let mut entry = entry();
        entry.summary = Some("Short summary".into());
        assert_eq!(entry.display_content(), "Short summary");
    }
}
