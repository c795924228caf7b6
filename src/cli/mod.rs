pub mod commands;

use clap::{Parser, Subcommand};

use crate::domain::EntryFilter;

pub const DEFAULT_LIST_LIMIT: usize = 50;

#[derive(Parser)]
#[command(name = "feedsync")]
#[command(about = "Offline cache for a Feedbin-style feed service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the first page and fully reconcile the cache
    Refresh {
        /// Entries requested per page (default from config)
        #[arg(long)]
        per_page: Option<u32>,
    },
    /// Fetch another page, reconciling incrementally when possible
    More {
        /// Page number to fetch
        #[arg(long)]
        page: u32,

        /// Entries requested per page (default from config)
        #[arg(long)]
        per_page: Option<u32>,

        /// View to print afterwards: all, unread or starred
        #[arg(long, default_value = "all")]
        filter: EntryFilter,

        #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: usize,
    },
    /// List cached entries
    List {
        #[arg(long, default_value = "all")]
        filter: EntryFilter,

        #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: usize,
    },
    /// Search cached entries
    Search {
        query: String,

        #[arg(long, default_value = "all")]
        filter: EntryFilter,

        #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: usize,
    },
    /// Flip an entry's unread flag
    ToggleRead {
        id: i64,

        /// Current unread state of the entry
        #[arg(long, action = clap::ArgAction::Set)]
        unread: bool,
    },
    /// Flip an entry's starred flag
    ToggleStar {
        id: i64,

        /// Current starred state of the entry
        #[arg(long, action = clap::ArgAction::Set)]
        starred: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_more() {
        let cli = Cli::try_parse_from(["feedsync", "more", "--page", "3", "--filter", "unread"])
            .unwrap();
        match cli.command {
            Commands::More {
                page,
                per_page,
                filter,
                limit,
            } => {
                assert_eq!(page, 3);
                assert_eq!(per_page, None);
                assert_eq!(filter, EntryFilter::Unread);
                assert_eq!(limit, DEFAULT_LIST_LIMIT);
            }
            _ => panic!("expected more"),
        }
    }

    #[test]
    fn test_parse_toggle_read() {
        let cli = Cli::try_parse_from(["feedsync", "toggle-read", "42", "--unread", "true"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::ToggleRead { id: 42, unread: true }
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_filter() {
        assert!(Cli::try_parse_from(["feedsync", "list", "--filter", "archived"]).is_err());
    }
}
