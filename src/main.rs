use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fpl_dashboard::api::health::HealthState;
use fpl_dashboard::api::latency::LatencyStats;
use fpl_dashboard::api::routes::{router, ApiState};
use fpl_dashboard::config::Config;
use fpl_dashboard::db::{self, PlayerStore};
use fpl_dashboard::error::Result;
use fpl_dashboard::ingest::{IngestScheduler, Ingestor};

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

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let pool = db::connect(&cfg.database_url).await?;
    let store = PlayerStore::new(pool);
    info!("Database ready at {} ({} players stored)", cfg.database_url, store.count().await?);

    let ingestor = Ingestor::from_config(&cfg, store.clone())?;

    // --- One-shot mode ---
    if cfg.ingest_interval_secs == 0 {
        let report = ingestor.ingest().await.inspect_err(|e| {
            if e.is_fetch() {
                error!("Failed to fetch league data: {e}");
            }
        })?;
        info!(
            "Successfully stored {} players ({} unknown teams, {} unknown positions)",
            report.inserted + report.updated,
            report.unknown_teams,
            report.unknown_positions,
        );
        return Ok(());
    }

    // --- Scheduled ingestion ---
    let health = Arc::new(HealthState::new());
    let latency = Arc::new(LatencyStats::new());
    let scheduler = IngestScheduler::new(
        ingestor,
        Duration::from_secs(cfg.ingest_interval_secs),
        Arc::clone(&health),
        Arc::clone(&latency),
    );
    tokio::spawn(async move { scheduler.run().await });

    // --- HTTP API server ---
    let app = router(ApiState { store, health, latency });
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
