use crate::app::{AppContext, Result, SyncError};
use crate::domain::{Entry, EntryFilter};
use crate::store::Store;

pub async fn refresh(ctx: &AppContext, per_page: Option<u32>) -> Result<()> {
    let per_page = per_page.unwrap_or(ctx.config.sync.per_page);
    println!("Refreshing...");

    let entries = ctx.engine.refresh(1, per_page).await?;
    let unread = entries.iter().filter(|e| e.is_unread).count();

    println!(
        "Refresh complete: {} cached entries, {} unread",
        entries.len(),
        unread
    );
    Ok(())
}

pub async fn load_more(
    ctx: &AppContext,
    page: u32,
    per_page: Option<u32>,
    filter: EntryFilter,
    limit: usize,
) -> Result<()> {
    if page == 0 {
        return Err(SyncError::Validation("pages start at 1".into()));
    }
    let per_page = per_page.unwrap_or(ctx.config.sync.per_page);

    let (entries, fetched) = ctx.engine.load_more(page, per_page, filter, limit).await?;
    if fetched == 0 {
        println!("No more entries");
    } else {
        println!("Fetched {} entries from page {}", fetched, page);
    }

    print_entries(ctx, &entries)
}

pub fn list_entries(ctx: &AppContext, filter: EntryFilter, limit: usize) -> Result<()> {
    let entries = ctx.engine.list_cached_by_filter(limit, filter)?;
    if entries.is_empty() {
        println!("No {} entries", filter);
        return Ok(());
    }

    print_entries(ctx, &entries)
}

pub fn search(ctx: &AppContext, query: &str, filter: EntryFilter, limit: usize) -> Result<()> {
    let entries = ctx.engine.search_cached(limit, filter, query)?;
    if entries.is_empty() {
        println!("No matches for '{}'", query);
        return Ok(());
    }

    print_entries(ctx, &entries)
}

pub async fn toggle_read(ctx: &AppContext, id: i64, current_unread: bool) -> Result<()> {
    let unread = ctx.engine.toggle_unread(id, current_unread).await?;
    println!(
        "Marked entry {} as {}",
        id,
        if unread { "unread" } else { "read" }
    );
    Ok(())
}

pub async fn toggle_star(ctx: &AppContext, id: i64, current_starred: bool) -> Result<()> {
    let starred = ctx.engine.toggle_starred(id, current_starred).await?;
    println!(
        "{} entry {}",
        if starred { "Starred" } else { "Unstarred" },
        id
    );
    Ok(())
}

fn print_entries(ctx: &AppContext, entries: &[Entry]) -> Result<()> {
    for entry in entries {
        println!("{}", format_entry(entry));
    }

    if let Some(synced) = ctx.engine.last_synced_at()? {
        println!(
            "{} entries ({} feeds), last synced {}",
            entries.len(),
            ctx.store.list_feeds()?.len(),
            synced.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

fn format_entry(entry: &Entry) -> String {
    let marker = match (entry.is_unread, entry.is_starred) {
        (true, true) => "*★",
        (true, false) => "* ",
        (false, true) => " ★",
        (false, false) => "  ",
    };
    let source = entry
        .feed_title
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or("unknown feed");

    format!(
        "{} {:>10}  {}  {}  [{}]",
        marker,
        entry.id,
        entry.published_at.format("%Y-%m-%d"),
        entry.display_title(),
        source
    )
}
