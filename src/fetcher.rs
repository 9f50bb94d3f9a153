use std::time::Duration;

use tracing::debug;

use crate::error::{AppError, Result};
use crate::types::LeagueData;

pub fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Single GET against the league endpoint.
///
/// Transport failures, non-2xx statuses and bodies that are not league data
/// all come back as [`AppError::Fetch`]; the caller has written nothing yet.
pub async fn fetch_league_data(client: &reqwest::Client, url: &str) -> Result<LeagueData> {
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::Fetch(format!("GET {url} failed: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(AppError::Fetch(format!("GET {url} returned {status}")));
    }

    let body = resp
        .bytes()
        .await
        .map_err(|e| AppError::Fetch(format!("reading body of {url} failed: {e}")))?;
    debug!(bytes = body.len(), "league payload received");

    serde_json::from_slice::<LeagueData>(&body)
        .map_err(|e| AppError::Fetch(format!("invalid league data from {url}: {e}")))
}
