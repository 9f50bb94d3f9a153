use crate::error::{AppError, Result};
use crate::ingest::IngestMode;

/// Fantasy Premier League bootstrap endpoint: teams, positions and every player.
pub const FPL_API_URL: &str = "https://fantasy.premierleague.com/api/bootstrap-static/";

pub const DATABASE_URL: &str = "sqlite:fpl.db";

/// Default cadence of scheduled ingestion runs (seconds).
pub const INGEST_INTERVAL_SECS: u64 = 3600;

/// Upstream request timeout (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Backoff between retries of a failed league fetch, in milliseconds.
/// Store failures are never retried.
pub const FETCH_RETRY_BACKOFF_MS: &[u64] = &[500, 2_000, 8_000];

/// Default N for top-N views.
pub const TOP_N: usize = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub fpl_api_url: String,
    pub database_url: String,
    pub log_level: String,
    pub api_port: u16,
    /// 0 = run a single ingestion and exit (INGEST_INTERVAL_SECS)
    pub ingest_interval_secs: u64,
    /// `upsert` keeps stale players, `replace` mirrors the upstream exactly (INGEST_MODE)
    pub ingest_mode: IngestMode,
    pub http_timeout_secs: u64,
    /// Names removed by the dedupe utility after duplicate cleanup (PURGE_NAMES, comma-separated).
    pub purge_names: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            fpl_api_url: var("FPL_API_URL").unwrap_or_else(|| FPL_API_URL.to_string()),
            database_url: var("DATABASE_URL").unwrap_or_else(|| DATABASE_URL.to_string()),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            api_port: var("API_PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            ingest_interval_secs: var("INGEST_INTERVAL_SECS")
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(INGEST_INTERVAL_SECS),
            ingest_mode: match var("INGEST_MODE") {
                Some(s) => s.parse::<IngestMode>()?,
                None => IngestMode::default(),
            },
            http_timeout_secs: var("HTTP_TIMEOUT_SECS")
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|&s| s > 0)
                .unwrap_or(HTTP_TIMEOUT_SECS),
            purge_names: var("PURGE_NAMES")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        })
    }
}
