//! Maintenance: collapse players stored more than once under the same name,
//! then purge any names listed in PURGE_NAMES.

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fpl_dashboard::config::Config;
use fpl_dashboard::db::{self, PlayerStore};
use fpl_dashboard::error::Result;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(&cfg).await {
        error!("Dedupe failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: &Config) -> Result<()> {
    let store = PlayerStore::new(db::connect(&cfg.database_url).await?);
    info!("Connected to {} ({} players)", cfg.database_url, store.count().await?);

    let groups = store.remove_duplicates().await?;
    for group in &groups {
        info!(name = %group.name, removed = group.removed, "Removed {} duplicate(s) of player: {}", group.removed, group.name);
    }
    let removed: u64 = groups.iter().map(|g| g.removed).sum();
    info!("Duplicate removal complete: {} rows removed across {} names", removed, groups.len());

    if !cfg.purge_names.is_empty() {
        let purged = store.delete_by_names(&cfg.purge_names).await?;
        info!("Purged {purged} rows matching {} listed names", cfg.purge_names.len());
    }

    info!("{} players remain", store.count().await?);
    Ok(())
}
