use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feedsync::app::AppContext;
use feedsync::cli::{commands, Cli, Commands};
use feedsync::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Refresh { per_page } => {
            commands::refresh(&ctx, per_page).await?;
        }
        Commands::More {
            page,
            per_page,
            filter,
            limit,
        } => {
            commands::load_more(&ctx, page, per_page, filter, limit).await?;
        }
        Commands::List { filter, limit } => {
            commands::list_entries(&ctx, filter, limit)?;
        }
        Commands::Search {
            query,
            filter,
            limit,
        } => {
            commands::search(&ctx, &query, filter, limit)?;
        }
        Commands::ToggleRead { id, unread } => {
            commands::toggle_read(&ctx, id, unread).await?;
        }
        Commands::ToggleStar { id, starred } => {
            commands::toggle_star(&ctx, id, starred).await?;
        }
    }

    Ok(())
}
