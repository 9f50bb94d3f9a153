use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::health::{HealthResponse, HealthState};
use crate::api::latency::{LatencyResponse, LatencyStats};
use crate::config::TOP_N;
use crate::db::PlayerStore;
use crate::error::{AppError, Result};
use crate::query::{self, FilterConfig, GroupKey, GroupTotal, NumericField};
use crate::types::PlayerRecord;

/// Largest top-N a client may ask for.
const MAX_TOP_N: usize = 100;

#[derive(Clone)]
pub struct ApiState {
    pub store: PlayerStore,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/players", get(get_players))
        .route("/players/top", get(get_top_players))
        .route("/teams/value", get(get_team_totals))
        .route("/filters", get(get_filters))
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct TopQuery {
    pub field: Option<NumericField>,
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct TotalsQuery {
    pub field: Option<NumericField>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct FiltersResponse {
    pub teams: Vec<String>,
    pub positions: Vec<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_players(
    State(state): State<ApiState>,
    Query(filter): Query<FilterConfig>,
) -> Result<Json<Vec<PlayerRecord>>> {
    let players = state
        .store
        .fetch_filtered(filter.team_filter(), filter.position_filter())
        .await?;
    let shown = query::apply(&players, &filter).into_iter().cloned().collect();
    Ok(Json(shown))
}

async fn get_top_players(
    State(state): State<ApiState>,
    Query(params): Query<TopQuery>,
) -> Result<Json<Vec<PlayerRecord>>> {
    let limit = params.limit.unwrap_or(TOP_N);
    if limit == 0 || limit > MAX_TOP_N {
        return Err(AppError::BadRequest(format!("limit must be between 1 and {MAX_TOP_N}")));
    }
    let field = params.field.unwrap_or(NumericField::GoalsScored);

    let players = state.store.fetch_all().await?;
    let top = query::top_n(&players, field, limit).into_iter().cloned().collect();
    Ok(Json(top))
}

async fn get_team_totals(
    State(state): State<ApiState>,
    Query(params): Query<TotalsQuery>,
) -> Result<Json<Vec<GroupTotal>>> {
    let field = params.field.unwrap_or(NumericField::Price);
    let players = state.store.fetch_all().await?;
    Ok(Json(query::sum_by(&players, GroupKey::Team, field)))
}

async fn get_filters(State(state): State<ApiState>) -> Result<Json<FiltersResponse>> {
    let players = state.store.fetch_all().await?;
    Ok(Json(FiltersResponse {
        teams: query::distinct(&players, GroupKey::Team),
        positions: query::distinct(&players, GroupKey::Position),
    }))
}

async fn get_health(State(state): State<ApiState>) -> Result<Json<HealthResponse>> {
    let stored = state.store.count().await?;
    Ok(Json(state.health.snapshot(stored)))
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    Json(state.latency.summary())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    fn player(name: &str, team: &str, position: &str, goals: i64, price: f64) -> PlayerRecord {
        PlayerRecord {
            name: name.to_string(),
            team: team.to_string(),
            position: position.to_string(),
            price,
            total_points: goals * 5,
            goals_scored: goals,
            assists: 0,
            minutes: 900,
        }
    }

    async fn serve() -> (String, ApiState) {
        let store = PlayerStore::new(memory_pool().await);
        for p in [
            player("Mohamed Salah", "Liverpool", "Midfielder", 19, 13.0),
            player("Bukayo Saka", "Arsenal", "Midfielder", 16, 10.0),
            player("Kai Havertz", "Arsenal", "Forward", 9, 8.0),
        ] {
            store.upsert(&p).await.unwrap();
        }
        let state = ApiState {
            store,
            health: Arc::new(HealthState::new()),
            latency: Arc::new(LatencyStats::new()),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state.clone());
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("http://{addr}"), state)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(url: &str) -> T {
        let resp = reqwest::get(url).await.unwrap();
        assert!(resp.status().is_success(), "{url} -> {}", resp.status());
        resp.json().await.unwrap()
    }

    #[tokio::test]
    async fn players_endpoint_filters_and_sorts() {
        let (base, _) = serve().await;

        let arsenal: Vec<PlayerRecord> =
            get_json(&format!("{base}/players?team=Arsenal&sort=price&dir=asc")).await;
        let names: Vec<_> = arsenal.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Kai Havertz", "Bukayo Saka"]);

        let all: Vec<PlayerRecord> = get_json(&format!("{base}/players?team=All&name=SA")).await;
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn top_and_totals_endpoints() {
        let (base, _) = serve().await;

        let top: Vec<PlayerRecord> = get_json(&format!("{base}/players/top?field=goals_scored&limit=2")).await;
        assert_eq!(top[0].name, "Mohamed Salah");
        assert_eq!(top[1].name, "Bukayo Saka");

        let totals: Vec<GroupTotal> = get_json(&format!("{base}/teams/value")).await;
        assert_eq!(totals[0].group, "Arsenal");
        assert_eq!(totals[0].total, 18.0);

        let resp = reqwest::get(format!("{base}/players/top?limit=0")).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn filters_and_health_endpoints() {
        let (base, state) = serve().await;
        state.health.record_success(3);

        let filters: FiltersResponse = get_json(&format!("{base}/filters")).await;
        assert_eq!(filters.teams, ["Arsenal", "Liverpool"]);
        assert_eq!(filters.positions, ["Forward", "Midfielder"]);

        let health: HealthResponse = get_json(&format!("{base}/health")).await;
        assert_eq!(health.stored_players, 3);
        assert_eq!(health.runs_ok, 1);
    }
}
