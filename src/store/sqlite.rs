use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::app::{Result, SyncError};
use crate::domain::{Entry, EntryFilter, Feed};
use crate::store::search::{self, SearchMode};
use crate::store::{migrations, Store, NEVER_SYNCED, SYNC_CURSOR_KEY};

const SELECT_ENTRY: &str = "SELECT e.id, e.feed_id, e.title, e.url, e.author, e.summary, e.content,
        e.published_at, e.fetched_at, e.is_unread, e.is_starred, f.title, f.folder_name
 FROM entries e
 LEFT JOIN feeds f ON f.id = e.feed_id";

const ORDER_BY: &str = "ORDER BY e.published_at DESC, e.id DESC";

const SUBSTRING_MATCH: &str = "(e.title LIKE ?1 ESCAPE '\\'
    OR e.author LIKE ?1 ESCAPE '\\'
    OR e.summary LIKE ?1 ESCAPE '\\'
    OR e.content LIKE ?1 ESCAPE '\\'
    OR e.url LIKE ?1 ESCAPE '\\'
    OR f.title LIKE ?1 ESCAPE '\\'
    OR f.folder_name LIKE ?1 ESCAPE '\\')";

const INDEXED_MATCH: &str = "(e.id IN (SELECT rowid FROM entries_fts WHERE entries_fts MATCH ?1)
    OR f.title LIKE ?2 ESCAPE '\\'
    OR f.folder_name LIKE ?2 ESCAPE '\\')";

// Keeps IN (...) lists well under SQLite's bound-parameter limit
const ID_CHUNK: usize = 500;

pub struct SqliteStore {
    conn: Mutex<Connection>,
    indexed: AtomicBool,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P, search: SearchMode) -> Result<Self> {
        let conn = Connection::open(path).map_err(SyncError::write("open cache"))?;
        Self::with_connection(conn, search)
    }

    pub fn in_memory(search: SearchMode) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(SyncError::write("open cache"))?;
        Self::with_connection(conn, search)
    }

    fn with_connection(conn: Connection, search: SearchMode) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
            indexed: AtomicBool::new(false),
        };
        store.run_migrations()?;
        if search == SearchMode::Indexed {
            store.init_search_index();
        }
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let mut conn = self.conn();
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")
            .map_err(SyncError::write("configure cache"))?;
        migrations::run(&mut conn)
    }

    fn init_search_index(&self) {
        let conn = self.conn();
        match search::init_index(&conn) {
            Ok(()) => self.indexed.store(true, Ordering::Release),
            Err(e) => {
                tracing::warn!("Search index unavailable, using substring search: {}", e);
                search::drop_triggers(&conn);
            }
        }
    }

    /// The search backend currently in use. Starts as configured and only
    /// ever moves from indexed to substring.
    pub fn search_mode(&self) -> SearchMode {
        if self.indexed.load(Ordering::Acquire) {
            SearchMode::Indexed
        } else {
            SearchMode::Substring
        }
    }

    fn downgrade_search(&self, conn: &Connection, err: &rusqlite::Error) {
        if self.indexed.swap(false, Ordering::AcqRel) {
            tracing::warn!("Indexed search failed, falling back to substring search: {}", err);
            search::drop_triggers(conn);
        }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
        Ok(Entry {
            id: row.get(0)?,
            feed_id: row.get(1)?,
            title: row.get(2)?,
            url: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            author: row.get(4)?,
            summary: row.get(5)?,
            content: row.get(6)?,
            published_at: row
                .get::<_, Option<String>>(7)?
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or(NEVER_SYNCED),
            fetched_at: row
                .get::<_, Option<String>>(8)?
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or(NEVER_SYNCED),
            is_unread: row.get::<_, i64>(9)? != 0,
            is_starred: row.get::<_, i64>(10)? != 0,
            feed_title: row.get(11)?,
            feed_folder: row.get(12)?,
        })
    }

    fn where_clause(filter: EntryFilter, matcher: Option<&str>) -> String {
        let clauses: Vec<&str> = [filter.predicate(), matcher.unwrap_or("")]
            .into_iter()
            .filter(|c| !c.is_empty())
            .collect();
        if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        }
    }

    fn query_entries<P: rusqlite::Params>(
        conn: &Connection,
        sql: &str,
        params: P,
    ) -> rusqlite::Result<Vec<Entry>> {
        let mut stmt = conn.prepare(sql)?;
        let entries = stmt
            .query_map(params, Self::entry_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn substring_search(
        conn: &Connection,
        limit: usize,
        filter: EntryFilter,
        query: &str,
    ) -> rusqlite::Result<Vec<Entry>> {
        let sql = format!(
            "{} {} {} LIMIT ?2",
            SELECT_ENTRY,
            Self::where_clause(filter, Some(SUBSTRING_MATCH)),
            ORDER_BY
        );
        Self::query_entries(conn, &sql, params![search::like_pattern(query), limit as i64])
    }

    fn indexed_search(
        conn: &Connection,
        limit: usize,
        filter: EntryFilter,
        expression: &str,
        query: &str,
    ) -> rusqlite::Result<Vec<Entry>> {
        let sql = format!(
            "{} {} {} LIMIT ?3",
            SELECT_ENTRY,
            Self::where_clause(filter, Some(INDEXED_MATCH)),
            ORDER_BY
        );
        Self::query_entries(
            conn,
            &sql,
            params![expression, search::like_pattern(query), limit as i64],
        )
    }
}

impl Store for SqliteStore {
    fn save_subscriptions(&self, feeds: &[Feed]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .map_err(SyncError::write("save subscriptions"))?;
        let now = Self::format_datetime(&Utc::now());

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO feeds (id, title, feed_url, site_url, folder_name, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(id) DO UPDATE SET
                         title = excluded.title,
                         feed_url = excluded.feed_url,
                         site_url = excluded.site_url,
                         folder_name = excluded.folder_name,
                         updated_at = excluded.updated_at",
                )
                .map_err(SyncError::write("save subscriptions"))?;

            for feed in feeds {
                stmt.execute(params![
                    feed.id,
                    feed.title,
                    feed.feed_url,
                    feed.site_url,
                    feed.folder,
                    now
                ])
                .map_err(SyncError::write("save subscriptions"))?;
            }
        }

        tx.commit().map_err(SyncError::write("save subscriptions"))
    }

    fn list_feeds(&self) -> Result<Vec<Feed>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, title, feed_url, site_url, folder_name
                 FROM feeds ORDER BY folder_name, title COLLATE NOCASE",
            )
            .map_err(SyncError::read("list feeds"))?;

        let feeds = stmt
            .query_map([], |row| {
                Ok(Feed {
                    id: row.get(0)?,
                    title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    feed_url: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    site_url: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    folder: row.get(4)?,
                })
            })
            .and_then(|rows| rows.collect::<std::result::Result<Vec<_>, _>>())
            .map_err(SyncError::read("list feeds"))?;

        Ok(feeds)
    }

    // Flags are only written on insert; existing rows keep theirs until the
    // next state reconciliation or toggle.
    fn save_entries(&self, entries: &[Entry]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().map_err(SyncError::write("save entries"))?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO entries (id, title, url, author, summary, content, feed_id,
                                          published_at, fetched_at, is_unread, is_starred)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                     ON CONFLICT(id) DO UPDATE SET
                         title = excluded.title,
                         url = excluded.url,
                         author = excluded.author,
                         summary = excluded.summary,
                         content = excluded.content,
                         feed_id = excluded.feed_id,
                         published_at = excluded.published_at,
                         fetched_at = excluded.fetched_at",
                )
                .map_err(SyncError::write("save entries"))?;

            for entry in entries {
                stmt.execute(params![
                    entry.id,
                    entry.title,
                    entry.url,
                    entry.author,
                    entry.summary,
                    entry.content,
                    entry.feed_id,
                    Self::format_datetime(&entry.published_at),
                    Self::format_datetime(&entry.fetched_at),
                    entry.is_unread,
                    entry.is_starred
                ])
                .map_err(SyncError::write("save entries"))?;
            }
        }

        tx.commit().map_err(SyncError::write("save entries"))
    }

    fn get_entry(&self, id: i64) -> Result<Option<Entry>> {
        let conn = self.conn();
        let sql = format!("{} WHERE e.id = ?1", SELECT_ENTRY);
        conn.query_row(&sql, params![id], Self::entry_from_row)
            .optional()
            .map_err(SyncError::read("get entry"))
    }

    fn cached_entry_ids(&self, ids: &[i64]) -> Result<HashSet<i64>> {
        let conn = self.conn();
        let mut found = HashSet::new();

        for chunk in ids.chunks(ID_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(",");
            let sql = format!("SELECT id FROM entries WHERE id IN ({})", placeholders);
            let mut stmt = conn.prepare(&sql).map_err(SyncError::read("cached ids"))?;
            let rows = stmt
                .query_map(params_from_iter(chunk.iter()), |row| row.get::<_, i64>(0))
                .and_then(|rows| rows.collect::<std::result::Result<Vec<_>, _>>())
                .map_err(SyncError::read("cached ids"))?;
            found.extend(rows);
        }

        Ok(found)
    }

    fn list_entries(&self, limit: usize) -> Result<Vec<Entry>> {
        self.list_entries_by_filter(limit, EntryFilter::All)
    }

    fn list_entries_by_filter(&self, limit: usize, filter: EntryFilter) -> Result<Vec<Entry>> {
        let conn = self.conn();
        let sql = format!(
            "{} {} {} LIMIT ?1",
            SELECT_ENTRY,
            Self::where_clause(filter, None),
            ORDER_BY
        );
        Self::query_entries(&conn, &sql, params![limit as i64])
            .map_err(SyncError::read("list entries"))
    }

    fn search_entries_by_filter(
        &self,
        limit: usize,
        filter: EntryFilter,
        query: &str,
    ) -> Result<Vec<Entry>> {
        let query = query.trim();
        if query.is_empty() {
            return self.list_entries_by_filter(limit, filter);
        }

        let conn = self.conn();
        if self.search_mode() == SearchMode::Indexed {
            if let Some(expression) = search::match_expression(query) {
                match Self::indexed_search(&conn, limit, filter, &expression, query) {
                    Ok(entries) => return Ok(entries),
                    Err(e) => self.downgrade_search(&conn, &e),
                }
            }
        }

        Self::substring_search(&conn, limit, filter, query).map_err(SyncError::read("search entries"))
    }

    fn save_entry_states(&self, unread_ids: &[i64], starred_ids: &[i64]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .map_err(SyncError::write("save entry states"))?;

        tx.execute(
            "UPDATE entries SET is_unread = 0, is_starred = 0
             WHERE is_unread != 0 OR is_starred != 0",
            [],
        )
        .map_err(SyncError::write("save entry states"))?;

        {
            let mut mark_unread = tx
                .prepare("UPDATE entries SET is_unread = 1 WHERE id = ?1")
                .map_err(SyncError::write("save entry states"))?;
            for id in unread_ids {
                mark_unread
                    .execute(params![id])
                    .map_err(SyncError::write("save entry states"))?;
            }

            let mut mark_starred = tx
                .prepare("UPDATE entries SET is_starred = 1 WHERE id = ?1")
                .map_err(SyncError::write("save entry states"))?;
            for id in starred_ids {
                mark_starred
                    .execute(params![id])
                    .map_err(SyncError::write("save entry states"))?;
            }
        }

        tx.commit().map_err(SyncError::write("save entry states"))
    }

    fn set_entry_unread(&self, id: i64, unread: bool) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "UPDATE entries SET is_unread = ?1 WHERE id = ?2",
            params![unread, id],
        )
        .map_err(SyncError::write("set entry unread"))?;
        Ok(())
    }

    fn set_entry_starred(&self, id: i64, starred: bool) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "UPDATE entries SET is_starred = ?1 WHERE id = ?2",
            params![starred, id],
        )
        .map_err(SyncError::write("set entry starred"))?;
        Ok(())
    }

    fn get_app_state(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT value FROM app_state WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(SyncError::read("get app state"))
    }

    fn set_app_state(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO app_state (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Self::format_datetime(&Utc::now())],
        )
        .map_err(SyncError::write("set app state"))?;
        Ok(())
    }

    fn get_sync_cursor(&self) -> Result<DateTime<Utc>> {
        match self.get_app_state(SYNC_CURSOR_KEY)? {
            None => Ok(NEVER_SYNCED),
            Some(value) => Self::parse_datetime(&value)
                .ok_or_else(|| SyncError::Decode(format!("invalid sync cursor '{}'", value))),
        }
    }

    fn set_sync_cursor(&self, cursor: DateTime<Utc>) -> Result<()> {
        self.set_app_state(SYNC_CURSOR_KEY, &Self::format_datetime(&cursor))
    }
}
