use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::config::FETCH_RETRY_BACKOFF_MS;
use crate::error::{AppError, Result};
use crate::ingest::{IngestReport, Ingestor};

#[derive(Debug)]
pub enum RunOutcome {
    Completed(IngestReport),
    Failed(AppError),
    /// Another run held the in-flight guard.
    Skipped,
}

/// Re-runs ingestion on a fixed cadence with at most one run in flight.
///
/// The first run starts immediately. Ticks missed while a run is active are
/// dropped rather than bursted. Fetch failures are retried on the backoff
/// schedule; store failures are logged and the next tick proceeds normally.
pub struct IngestScheduler {
    ingestor: Ingestor,
    period: Duration,
    health: Arc<HealthState>,
    latency: Arc<LatencyStats>,
    retry_backoff: Vec<Duration>,
}

impl IngestScheduler {
    pub fn new(
        ingestor: Ingestor,
        period: Duration,
        health: Arc<HealthState>,
        latency: Arc<LatencyStats>,
    ) -> Self {
        Self {
            ingestor,
            period,
            health,
            latency,
            retry_backoff: FETCH_RETRY_BACKOFF_MS
                .iter()
                .map(|&ms| Duration::from_millis(ms))
                .collect(),
        }
    }

    pub fn with_retry_backoff(mut self, backoff: Vec<Duration>) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub async fn run(self) {
        info!(
            every_secs = self.period.as_secs(),
            mode = %self.ingestor.mode(),
            "Ingest scheduler started"
        );
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            self.run_once().await;
        }
    }

    pub async fn run_once(&self) -> RunOutcome {
        let Some(_guard) = self.health.try_begin_run() else {
            warn!("Ingest trigger skipped: previous run still in flight");
            return RunOutcome::Skipped;
        };

        let started = Instant::now();
        match self.ingest_with_retry().await {
            Ok(report) => {
                self.latency.record(started.elapsed());
                self.health.record_success(report.inserted + report.updated);
                RunOutcome::Completed(report)
            }
            Err(e) => {
                if e.is_fetch() {
                    error!("Failed to fetch league data: {e}");
                } else {
                    error!("Ingest run aborted: {e}");
                }
                self.health.record_failure();
                RunOutcome::Failed(e)
            }
        }
    }

    async fn ingest_with_retry(&self) -> Result<IngestReport> {
        let mut attempt = 0;
        loop {
            match self.ingestor.ingest().await {
                Err(e) if e.is_fetch() && attempt < self.retry_backoff.len() => {
                    let delay = self.retry_backoff[attempt];
                    attempt += 1;
                    warn!(attempt, "League fetch failed: {e}; retrying in {delay:?}");
                    sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::db::{memory_pool, PlayerStore};
    use crate::fetcher::build_client;
    use crate::ingest::test_upstream::{element, league, Upstream};
    use crate::ingest::IngestMode;

    async fn scheduler(upstream: &Upstream) -> IngestScheduler {
        let store = PlayerStore::new(memory_pool().await);
        let ingestor = Ingestor::new(build_client(5).unwrap(), upstream.url.clone(), store, IngestMode::Upsert);
        IngestScheduler::new(
            ingestor,
            Duration::from_secs(60),
            Arc::new(HealthState::new()),
            Arc::new(LatencyStats::new()),
        )
        .with_retry_backoff(vec![Duration::from_millis(1), Duration::from_millis(1)])
    }

    #[tokio::test]
    async fn successful_run_updates_health_and_latency() {
        let upstream = Upstream::start(league(vec![element("Bukayo", "Saka", 1, 3, 102, 16)])).await;
        let scheduler = scheduler(&upstream).await;

        assert!(matches!(scheduler.run_once().await, RunOutcome::Completed(_)));
        assert_eq!(scheduler.health.runs_ok(), 1);
        assert!(!scheduler.health.in_flight());
        assert_eq!(scheduler.latency.summary().sample_count, 1);
    }

    #[tokio::test]
    async fn skips_while_a_run_is_in_flight() {
        let upstream = Upstream::start(league(vec![])).await;
        let scheduler = scheduler(&upstream).await;

        let held = scheduler.health.try_begin_run();
        assert!(held.is_some());
        assert!(matches!(scheduler.run_once().await, RunOutcome::Skipped));
        assert_eq!(scheduler.health.runs_skipped(), 1);
        assert_eq!(upstream.hits(), 0);

        drop(held);
        assert!(matches!(scheduler.run_once().await, RunOutcome::Completed(_)));
    }

    #[tokio::test]
    async fn fetch_failure_is_retried_then_reported() {
        let upstream = Upstream::start(league(vec![])).await;
        upstream.respond(StatusCode::BAD_GATEWAY, league(vec![]));
        let scheduler = scheduler(&upstream).await;

        match scheduler.run_once().await {
            RunOutcome::Failed(e) => assert!(e.is_fetch()),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(upstream.hits(), 3);
        assert_eq!(scheduler.health.runs_failed(), 1);
        assert!(!scheduler.health.in_flight());
        assert_eq!(scheduler.latency.summary().sample_count, 0);
    }

    #[tokio::test]
    async fn store_failure_is_reported_without_retry() {
        let upstream = Upstream::start(league(vec![element("Bukayo", "Saka", 1, 3, 102, 16)])).await;
        let scheduler = scheduler(&upstream).await;
        sqlx::query("DROP TABLE players")
            .execute(scheduler.ingestor.store().pool())
            .await
            .unwrap();

        match scheduler.run_once().await {
            RunOutcome::Failed(e) => assert!(e.is_store(), "expected store error, got {e}"),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(upstream.hits(), 1);
        assert_eq!(scheduler.health.runs_failed(), 1);
        assert!(!scheduler.health.in_flight());
    }
}
