//! Schema setup for the cache database.
//!
//! The base tables come from a versioned `rusqlite_migration` step. Caches
//! written by older builds may predate some columns, so every open also walks
//! [`COLUMN_MIGRATIONS`] and adds whatever is missing. Both passes only ever
//! add; nothing is dropped or rewritten.

use rusqlite::Connection;
use rusqlite_migration::{Migrations, M};

use crate::app::{Result, SyncError};

/// A column that must exist on `table`. `decl` is the column type plus any
/// constraint/default, exactly as it goes after the column name.
#[derive(Debug, Clone, Copy)]
pub struct ColumnMigration {
    pub table: &'static str,
    pub column: &'static str,
    pub decl: &'static str,
}

const fn column(table: &'static str, column: &'static str, decl: &'static str) -> ColumnMigration {
    ColumnMigration {
        table,
        column,
        decl,
    }
}

pub const COLUMN_MIGRATIONS: &[ColumnMigration] = &[
    column("feeds", "site_url", "TEXT NOT NULL DEFAULT ''"),
    column("feeds", "folder_name", "TEXT"),
    column("feeds", "updated_at", "TEXT"),
    column("entries", "summary", "TEXT"),
    column("entries", "content", "TEXT"),
    column("entries", "fetched_at", "TEXT NOT NULL DEFAULT ''"),
    column("entries", "is_starred", "INTEGER NOT NULL DEFAULT 0"),
    column("app_state", "updated_at", "TEXT NOT NULL DEFAULT ''"),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_entries_unread_published ON entries(is_unread, published_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_entries_starred_published ON entries(is_starred, published_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_entries_published ON entries(published_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_entries_feed_id ON entries(feed_id)",
    "CREATE INDEX IF NOT EXISTS idx_feeds_title ON feeds(title)",
    "CREATE INDEX IF NOT EXISTS idx_feeds_folder ON feeds(folder_name)",
];

pub fn run(conn: &mut Connection) -> Result<()> {
    let migrations = Migrations::new(vec![M::up(include_str!(
        "../../migrations/001-initial/up.sql"
    ))]);
    migrations.to_latest(conn)?;

    for migration in COLUMN_MIGRATIONS {
        add_column(conn, migration)?;
    }

    for sql in INDEXES {
        conn.execute(sql, [])
            .map_err(SyncError::write("create index"))?;
    }

    Ok(())
}

/// `ALTER TABLE .. ADD COLUMN`, where an existing column counts as done.
pub fn add_column(conn: &Connection, migration: &ColumnMigration) -> Result<()> {
    let sql = format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        migration.table, migration.column, migration.decl
    );

    match conn.execute(&sql, []) {
        Ok(_) => {
            tracing::info!(
                "Added column {}.{} to cache schema",
                migration.table,
                migration.column
            );
            Ok(())
        }
        Err(e) if is_duplicate_column(&e) => Ok(()),
        Err(e) => Err(SyncError::CacheWrite {
            stage: "add column",
            source: e,
        }),
    }
}

fn is_duplicate_column(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("duplicate column name")
    )
}
