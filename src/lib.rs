//! # feedsync
//!
//! An offline-first cache for a Feedbin-style feed aggregation service.
//!
//! ## Architecture
//!
//! ```text
//! RemoteClient → SyncEngine → Store → CLI
//! ```
//!
//! - [`remote`]: HTTP client for the service's entry, subscription and state endpoints
//! - [`sync`]: Page sync with full or incremental reconciliation
//! - [`store`]: SQLite cache with substring or FTS5 search
//!
//! ## Quick Start
//!
//! ```bash
//! # First sync
//! FEEDSYNC_USERNAME=me@example.com FEEDSYNC_PASSWORD=... feedsync refresh
//!
//! # Next page, printing unread entries
//! feedsync more --page 2 --filter unread
//!
//! # Search the cache offline
//! feedsync search "rust async"
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together config, store,
/// remote client and sync engine.
pub mod app;

/// Command-line interface using clap.
///
/// - `refresh` - Fetch page 1 and fully reconcile
/// - `more --page N` - Fetch another page
/// - `list` / `search <query>` - Read the cache
/// - `toggle-read` / `toggle-star` - Flip entry state remotely and locally
pub mod cli;

/// Configuration loaded from `~/.config/feedsync/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`Entry`](domain::Entry): A cached entry with its unread/starred flags
/// - [`Feed`](domain::Feed): A subscription, with its derived folder
/// - [`EntryFilter`](domain::EntryFilter): All, unread or starred view
pub mod domain;

/// Remote service access.
///
/// - [`RemoteClient`](remote::RemoteClient): Async trait over the service API
/// - [`HttpRemote`](remote::HttpRemote): reqwest-based implementation
pub mod remote;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining cache operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;

/// Sync orchestration.
pub mod sync;
