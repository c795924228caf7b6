use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A subscribed feed as cached locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub id: i64,
    pub title: String,
    pub feed_url: String,
    pub site_url: String,
    /// Derived from taggings at sync time, see [`derive_folders`].
    pub folder: Option<String>,
}

impl Feed {
    pub fn new(id: i64, title: String, feed_url: String, site_url: String) -> Self {
        Self {
            id,
            title,
            feed_url,
            site_url,
            folder: None,
        }
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.feed_url
        } else {
            &self.title
        }
    }
}

/// A remote (feed, folder) pair. Only used to compute [`Feed::folder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tagging {
    pub feed_id: i64,
    pub name: String,
}

/// Pick one folder per feed: the smallest tagging name, compared
/// case-insensitively. Ties on the lowercased name fall back to the raw name
/// so the choice is stable.
pub fn derive_folders(taggings: &[Tagging]) -> HashMap<i64, String> {
    let mut folders: HashMap<i64, String> = HashMap::new();

    for tagging in taggings {
        let name = tagging.name.trim();
        if name.is_empty() {
            continue;
        }

        match folders.get(&tagging.feed_id) {
            Some(current) if !folder_precedes(name, current) => {}
            _ => {
                folders.insert(tagging.feed_id, name.to_string());
            }
        }
    }

    folders
}

/// Assign derived folders to feeds. Feeds without a tagging get `None`.
pub fn apply_folders(feeds: &mut [Feed], taggings: &[Tagging]) {
    let folders = derive_folders(taggings);
    for feed in feeds {
        feed.folder = folders.get(&feed.id).cloned();
    }
}

fn folder_precedes(candidate: &str, current: &str) -> bool {
    let (a, b) = (candidate.to_lowercase(), current.to_lowercase());
    a < b || (a == b && candidate < current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagging(feed_id: i64, name: &str) -> Tagging {
        Tagging {
            feed_id,
            name: name.into(),
        }
    }

    #[test]
    fn test_smallest_folder_wins_case_insensitive() {
        let folders = derive_folders(&[tagging(10, "Z"), tagging(10, "Formula 1")]);
        assert_eq!(folders.get(&10).map(String::as_str), Some("Formula 1"));
    }

    #[test]
    fn test_lowercase_does_not_sort_after_uppercase() {
        let folders = derive_folders(&[tagging(1, "Tech"), tagging(1, "news")]);
        assert_eq!(folders.get(&1).map(String::as_str), Some("news"));
    }

    #[test]
    fn test_blank_names_are_ignored() {
        let folders = derive_folders(&[tagging(1, "  "), tagging(2, "Rust")]);
        assert!(!folders.contains_key(&1));
        assert_eq!(folders.get(&2).map(String::as_str), Some("Rust"));
    }

    #[test]
    fn test_apply_folders_clears_untagged_feeds() {
        let mut feed = Feed::new(3, "Feed".into(), "https://a/feed".into(), "https://a".into());
        feed.folder = Some("Old".into());
        let mut feeds = vec![feed];

        apply_folders(&mut feeds, &[tagging(4, "Other")]);
        assert_eq!(feeds[0].folder, None);
    }

    #[test]
    fn test_display_title_falls_back_to_url() {
        let feed = Feed::new(1, String::new(), "https://a/feed".into(), "https://a".into());
        assert_eq!(feed.display_title(), "https://a/feed");
    }
}
