//! Text search backends.
//!
//! Substring search needs nothing beyond the base tables. Indexed search
//! keeps an external-content FTS5 table (`entries_fts`, rowid = entries.id)
//! in step with `entries` through triggers.

use std::fmt;
use std::str::FromStr;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::app::SyncError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Substring,
    Indexed,
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Substring => f.write_str("substring"),
            SearchMode::Indexed => f.write_str("indexed"),
        }
    }
}

impl FromStr for SearchMode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "substring" | "like" => Ok(SearchMode::Substring),
            "indexed" | "fts" => Ok(SearchMode::Indexed),
            other => Err(SyncError::Validation(format!(
                "unknown search mode '{}'",
                other
            ))),
        }
    }
}

const FTS_TABLE: &str = "CREATE VIRTUAL TABLE IF NOT EXISTS entries_fts USING fts5(
    title, author, summary, content, url,
    content='entries', content_rowid='id'
)";

const FTS_TRIGGERS: &str = "
CREATE TRIGGER IF NOT EXISTS entries_fts_ai AFTER INSERT ON entries BEGIN
    INSERT INTO entries_fts(rowid, title, author, summary, content, url)
    VALUES (NEW.id, NEW.title, NEW.author, NEW.summary, NEW.content, NEW.url);
END;
CREATE TRIGGER IF NOT EXISTS entries_fts_ad AFTER DELETE ON entries BEGIN
    INSERT INTO entries_fts(entries_fts, rowid, title, author, summary, content, url)
    VALUES ('delete', OLD.id, OLD.title, OLD.author, OLD.summary, OLD.content, OLD.url);
END;
CREATE TRIGGER IF NOT EXISTS entries_fts_au
AFTER UPDATE OF title, author, summary, content, url ON entries BEGIN
    INSERT INTO entries_fts(entries_fts, rowid, title, author, summary, content, url)
    VALUES ('delete', OLD.id, OLD.title, OLD.author, OLD.summary, OLD.content, OLD.url);
    INSERT INTO entries_fts(rowid, title, author, summary, content, url)
    VALUES (NEW.id, NEW.title, NEW.author, NEW.summary, NEW.content, NEW.url);
END;
";

const TRIGGER_NAMES: [&str; 3] = ["entries_fts_ai", "entries_fts_ad", "entries_fts_au"];

/// Create the index and its triggers, rebuilding the index when it is new or
/// when writes may have bypassed it.
pub fn init_index(conn: &Connection) -> rusqlite::Result<()> {
    let had_table = object_exists(conn, "table", "entries_fts")?;
    let mut had_triggers = true;
    for name in TRIGGER_NAMES {
        had_triggers &= object_exists(conn, "trigger", name)?;
    }

    conn.execute(FTS_TABLE, [])?;
    conn.execute_batch(FTS_TRIGGERS)?;

    if !had_table || !had_triggers {
        tracing::info!("Rebuilding search index");
        conn.execute("INSERT INTO entries_fts(entries_fts) VALUES('rebuild')", [])?;
    }

    // Fails when the name is taken by something that is not an FTS5 table
    conn.query_row(
        "SELECT COUNT(*) FROM entries_fts WHERE entries_fts MATCH '\"feedsync\"'",
        [],
        |row| row.get::<_, i64>(0),
    )?;

    Ok(())
}

/// Remove the sync triggers so entry writes no longer touch the index.
pub fn drop_triggers(conn: &Connection) {
    for name in TRIGGER_NAMES {
        if let Err(e) = conn.execute(&format!("DROP TRIGGER IF EXISTS {}", name), []) {
            tracing::warn!("Failed to drop trigger {}: {}", name, e);
        }
    }
}

fn object_exists(conn: &Connection, kind: &str, name: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2)",
        [kind, name],
        |row| row.get(0),
    )
}

/// Split a query into alphanumeric tokens.
pub fn tokenize(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Build a prefix MATCH expression requiring every token, or `None` when the
/// query has no tokens.
pub fn match_expression(query: &str) -> Option<String> {
    let tokens = tokenize(query);
    if tokens.is_empty() {
        return None;
    }
    Some(
        tokens
            .iter()
            .map(|t| format!("\"{}\"*", t))
            .collect::<Vec<_>>()
            .join(" AND "),
    )
}

/// LIKE pattern matching `query` anywhere, with `\` as the escape character.
pub fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_drops_punctuation() {
        assert_eq!(tokenize("rust, async-await!"), vec!["rust", "async", "await"]);
        assert!(tokenize(" -- ").is_empty());
    }

    #[test]
    fn test_match_expression_ands_prefixes() {
        assert_eq!(
            match_expression("formula one").as_deref(),
            Some("\"formula\"* AND \"one\"*")
        );
        assert_eq!(match_expression("!!"), None);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_search_mode_parse() {
        assert_eq!("indexed".parse::<SearchMode>().unwrap(), SearchMode::Indexed);
        assert_eq!("Substring".parse::<SearchMode>().unwrap(), SearchMode::Substring);
        assert!("regex".parse::<SearchMode>().is_err());
    }

    #[test]
    fn test_init_index_twice() {
        let mut conn = Connection::open_in_memory().unwrap();
        crate::store::migrations::run(&mut conn).unwrap();
        init_index(&conn).unwrap();
        init_index(&conn).unwrap();
    }
}
