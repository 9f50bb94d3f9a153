//! Shared ingestion health for the /health endpoint.
//! Updated by the IngestScheduler, read by the API.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

#[derive(Default)]
pub struct HealthState {
    /// True while an ingestion run holds the run guard.
    in_flight: AtomicBool,
    runs_ok: AtomicU64,
    runs_failed: AtomicU64,
    /// Triggers dropped because a run was already in flight.
    runs_skipped: AtomicU64,
    /// Unix seconds of the last successful run (0 = never).
    last_success_at: AtomicU64,
    /// Unix seconds of the last failed run (0 = never).
    last_failure_at: AtomicU64,
    /// Players written by the last successful run.
    last_batch_size: AtomicU64,
}

/// Clears the in-flight flag when dropped.
pub struct RunGuard<'a> {
    health: &'a HealthState,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.health.in_flight.store(false, Ordering::Release);
    }
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the single in-flight slot. `None` (and a skip is counted) if a run
    /// is already active.
    pub fn try_begin_run(&self) -> Option<RunGuard<'_>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            Some(RunGuard { health: self })
        } else {
            self.runs_skipped.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    pub fn record_success(&self, batch_size: usize) {
        self.runs_ok.fetch_add(1, Ordering::Relaxed);
        self.last_success_at.store(now_secs(), Ordering::Relaxed);
        self.last_batch_size.store(batch_size as u64, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
        self.last_failure_at.store(now_secs(), Ordering::Relaxed);
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn runs_ok(&self) -> u64 {
        self.runs_ok.load(Ordering::Relaxed)
    }

    pub fn runs_failed(&self) -> u64 {
        self.runs_failed.load(Ordering::Relaxed)
    }

    pub fn runs_skipped(&self) -> u64 {
        self.runs_skipped.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self, stored_players: i64) -> HealthResponse {
        let nonzero = |v: u64| (v > 0).then_some(v);
        HealthResponse {
            ingest_in_flight: self.in_flight(),
            runs_ok: self.runs_ok(),
            runs_failed: self.runs_failed(),
            runs_skipped: self.runs_skipped(),
            last_success_at: nonzero(self.last_success_at.load(Ordering::Relaxed)),
            last_failure_at: nonzero(self.last_failure_at.load(Ordering::Relaxed)),
            last_batch_size: self.last_batch_size.load(Ordering::Relaxed),
            stored_players,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ingest_in_flight: bool,
    pub runs_ok: u64,
    pub runs_failed: u64,
    pub runs_skipped: u64,
    pub last_success_at: Option<u64>,
    pub last_failure_at: Option<u64>,
    pub last_batch_size: u64,
    pub stored_players: i64,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
