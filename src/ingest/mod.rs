pub mod normalize;
pub mod scheduler;

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::db::{PlayerStore, UpsertOutcome};
use crate::error::{AppError, Result};
use crate::fetcher::{build_client, fetch_league_data};

pub use normalize::{normalize, UNKNOWN};
pub use scheduler::{IngestScheduler, RunOutcome};

/// How a run reconciles the store with the fresh snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    /// Upsert by name; players missing from the snapshot stay in the store.
    #[default]
    Upsert,
    /// Delete everything and insert the snapshot in one transaction.
    Replace,
}

impl FromStr for IngestMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upsert" => Ok(IngestMode::Upsert),
            "replace" => Ok(IngestMode::Replace),
            other => Err(AppError::Config(format!(
                "INGEST_MODE must be `upsert` or `replace`, got `{other}`"
            ))),
        }
    }
}

impl fmt::Display for IngestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestMode::Upsert => write!(f, "upsert"),
            IngestMode::Replace => write!(f, "replace"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub mode: IngestMode,
    /// Athletes in the upstream payload.
    pub fetched: usize,
    pub inserted: usize,
    pub updated: usize,
    /// Rows deleted (replace mode only).
    pub removed: u64,
    pub unknown_teams: usize,
    pub unknown_positions: usize,
    /// Payload rows folded into a later row with the same name.
    pub collapsed: usize,
    pub duration: Duration,
}

/// One fetch → normalize → store cycle against a fixed endpoint and store.
#[derive(Debug, Clone)]
pub struct Ingestor {
    client: reqwest::Client,
    api_url: String,
    store: PlayerStore,
    mode: IngestMode,
}

impl Ingestor {
    pub fn new(client: reqwest::Client, api_url: String, store: PlayerStore, mode: IngestMode) -> Self {
        Self { client, api_url, store, mode }
    }

    pub fn from_config(cfg: &Config, store: PlayerStore) -> Result<Self> {
        let client = build_client(cfg.http_timeout_secs)?;
        Ok(Self::new(client, cfg.fpl_api_url.clone(), store, cfg.ingest_mode))
    }

    pub fn mode(&self) -> IngestMode {
        self.mode
    }

    pub fn store(&self) -> &PlayerStore {
        &self.store
    }

    /// Run one ingestion.
    ///
    /// Nothing is written unless the fetch and parse succeed. In upsert mode
    /// each player is its own transaction, so a failure part way through
    /// leaves earlier players updated.
    pub async fn ingest(&self) -> Result<IngestReport> {
        let started = Instant::now();

        let data = fetch_league_data(&self.client, &self.api_url).await?;
        let normalized = normalize(&data);

        let mut report = IngestReport {
            mode: self.mode,
            fetched: data.elements.len(),
            unknown_teams: normalized.unknown_teams,
            unknown_positions: normalized.unknown_positions,
            collapsed: normalized.collapsed,
            ..Default::default()
        };

        match self.mode {
            IngestMode::Upsert => {
                for player in &normalized.players {
                    match self.store.upsert(player).await? {
                        UpsertOutcome::Inserted => report.inserted += 1,
                        UpsertOutcome::Updated => report.updated += 1,
                    }
                }
            }
            IngestMode::Replace => {
                report.removed = self.store.replace_all(&normalized.players).await?;
                report.inserted = normalized.players.len();
            }
        }

        report.duration = started.elapsed();
        info!(
            mode = %report.mode,
            fetched = report.fetched,
            inserted = report.inserted,
            updated = report.updated,
            removed = report.removed,
            unknown_teams = report.unknown_teams,
            unknown_positions = report.unknown_positions,
            collapsed = report.collapsed,
            "Stored {} players ({} new, {} updated) in {:.0}ms",
            report.inserted + report.updated,
            report.inserted,
            report.updated,
            report.duration.as_secs_f64() * 1000.0,
        );

        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Test upstream
// ---------------------------------------------------------------------------

/// Local stand-in for the league endpoint whose status and body can be swapped
/// between requests.
#[cfg(test)]
pub(crate) mod test_upstream {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use axum::{http::StatusCode, routing::get, Router};
    use serde_json::{json, Value};

    #[derive(Clone)]
    pub struct Upstream {
        pub url: String,
        response: Arc<Mutex<(StatusCode, String)>>,
        hits: Arc<AtomicUsize>,
    }

    impl Upstream {
        pub async fn start(body: Value) -> Self {
            let response = Arc::new(Mutex::new((StatusCode::OK, body.to_string())));
            let hits = Arc::new(AtomicUsize::new(0));
            let shared = Arc::clone(&response);
            let counter = Arc::clone(&hits);
            let app = Router::new().route(
                "/api/bootstrap-static/",
                get(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let reply = shared.lock().unwrap().clone();
                    async move { reply }
                }),
            );

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

            Self {
                url: format!("http://{addr}/api/bootstrap-static/"),
                response,
                hits,
            }
        }

        pub fn hits(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }

        pub fn respond(&self, status: StatusCode, body: Value) {
            *self.response.lock().unwrap() = (status, body.to_string());
        }

        pub fn respond_raw(&self, status: StatusCode, body: &str) {
            *self.response.lock().unwrap() = (status, body.to_string());
        }
    }

    pub fn element(first: &str, second: &str, team: i64, element_type: i64, cost: i64, goals: i64) -> Value {
        json!({
            "first_name": first,
            "second_name": second,
            "team": team,
            "element_type": element_type,
            "now_cost": cost,
            "total_points": goals * 6,
            "goals_scored": goals,
            "assists": 2,
            "minutes": 1800,
        })
    }

    pub fn league(elements: Vec<Value>) -> Value {
        json!({
            "teams": [
                {"id": 1, "name": "Arsenal"},
                {"id": 12, "name": "Liverpool"},
            ],
            "element_types": [
                {"id": 1, "singular_name": "Goalkeeper"},
                {"id": 3, "singular_name": "Midfielder"},
                {"id": 4, "singular_name": "Forward"},
            ],
            "elements": elements,
        })
    }
}
