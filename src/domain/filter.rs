use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::app::SyncError;

/// Which slice of the cache a listing or search covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryFilter {
    #[default]
    All,
    Unread,
    Starred,
}

impl EntryFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryFilter::All => "all",
            EntryFilter::Unread => "unread",
            EntryFilter::Starred => "starred",
        }
    }

    /// SQL predicate over the `e` alias, empty for `All`.
    pub(crate) fn predicate(self) -> &'static str {
        match self {
            EntryFilter::All => "",
            EntryFilter::Unread => "e.is_unread = 1",
            EntryFilter::Starred => "e.is_starred = 1",
        }
    }
}

impl fmt::Display for EntryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryFilter {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(EntryFilter::All),
            "unread" => Ok(EntryFilter::Unread),
            "starred" => Ok(EntryFilter::Starred),
            other => Err(SyncError::Validation(format!(
                "unknown filter '{}', expected all, unread or starred",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filters() {
        assert_eq!("unread".parse::<EntryFilter>().unwrap(), EntryFilter::Unread);
        assert_eq!(" Starred ".parse::<EntryFilter>().unwrap(), EntryFilter::Starred);
        assert_eq!("".parse::<EntryFilter>().unwrap(), EntryFilter::All);
    }

    #[test]
    fn test_unknown_filter_is_validation_error() {
        let err = "archived".parse::<EntryFilter>().unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
    }
}
