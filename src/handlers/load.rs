use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

use latency_proxy::LatencyReport;

use crate::AppState;

use super::AppError;

const MAX_WORKERS: u32 = 500;
const MAX_RUN_SECS: u64 = 300;

// ─── Request / response types ────────────────────────────────────

/// Shape of a load run against the monitored catalog.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoadPlan {
    pub workers: u32,
    pub duration_secs: u64,
    /// Share of lookups (`get_user`, `get_session`) versus creations, 0–100.
    pub read_pct: u8,
}

impl Default for LoadPlan {
    fn default() -> Self {
        Self {
            workers: 10,
            duration_secs: 30,
            read_pct: 70,
        }
    }
}

impl LoadPlan {
    fn check(&self) -> Result<(), AppError> {
        if !(1..=MAX_WORKERS).contains(&self.workers) {
            return Err(AppError::BadRequest(format!(
                "workers must be between 1 and {MAX_WORKERS}"
            )));
        }
        if !(1..=MAX_RUN_SECS).contains(&self.duration_secs) {
            return Err(AppError::BadRequest(format!(
                "duration_secs must be between 1 and {MAX_RUN_SECS}"
            )));
        }
        if self.read_pct > 100 {
            return Err(AppError::BadRequest("read_pct must be at most 100".into()));
        }
        Ok(())
    }
}

/// What the catalog proxy looks like right now.
#[derive(Debug, Serialize)]
pub struct LoadStatus {
    pub running: bool,
    pub users: usize,
    pub monitored_calls: usize,
}

impl LoadStatus {
    fn of(state: &AppState) -> Self {
        Self {
            running: state.load_running.load(Ordering::SeqCst),
            users: state.catalog.source().user_count(),
            monitored_calls: state.catalog.registry().list_keys().len(),
        }
    }
}

// ─── POST /api/load/start ────────────────────────────────────────

pub async fn start_load(
    State(state): State<Arc<AppState>>,
    Json(plan): Json<LoadPlan>,
) -> Result<Json<LoadStatus>, AppError> {
    plan.check()?;

    // Held across claim and spawn so `stop_load` always sees the new handle.
    let mut slot = state.load_handle.lock().await;

    if state
        .load_running
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Err(AppError::AlreadyRunning);
    }

    info!(
        workers = plan.workers,
        duration_secs = plan.duration_secs,
        read_pct = plan.read_pct,
        "starting catalog load"
    );

    let running = Arc::clone(&state.load_running);
    let catalog = Arc::clone(&state.catalog);
    *slot = Some(tokio::spawn(crate::load_generator::run(
        running,
        catalog,
        plan.workers,
        plan.duration_secs,
        plan.read_pct,
    )));
    drop(slot);

    Ok(Json(LoadStatus::of(&state)))
}

// ─── POST /api/load/stop ─────────────────────────────────────────

pub async fn stop_load(State(state): State<Arc<AppState>>) -> Json<LoadStatus> {
    state.load_running.store(false, Ordering::SeqCst);

    let handle = state.load_handle.lock().await.take();
    if let Some(handle) = handle {
        if let Err(e) = handle.await {
            warn!(error = %e, "load run ended abnormally");
        }
    }

    Json(LoadStatus::of(&state))
}

// ─── GET /api/load/status ────────────────────────────────────────

pub async fn load_status(State(state): State<Arc<AppState>>) -> Json<LoadStatus> {
    Json(LoadStatus::of(&state))
}
