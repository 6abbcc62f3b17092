use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::{BroadcastStream, IntervalStream};
use tokio_stream::StreamExt;

use super::registry::{LatencyReport, RegistrySnapshot};
use crate::error::MonitorError;

/// Shared handle every reporting route reads from.
pub type ReportState = Arc<dyn LatencyReport>;

/// Snapshot push interval on the SSE stream.
const STREAM_INTERVAL_MS: u64 = 500;

/// Routes exposing a registry to HTTP clients. State is already applied,
/// so the result merges into any application router.
pub fn router(report: ReportState) -> Router {
    Router::new()
        .route("/api/monitors", get(get_monitors))
        .route("/api/monitors/keys", get(get_keys))
        .route("/api/monitors/stream", get(monitors_stream))
        .route("/api/monitors/:key", get(get_monitor))
        .with_state(report)
}

// ─── Response types ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct MonitorAverage {
    pub key: String,
    pub average: u64,
}

// ─── GET /api/monitors ───────────────────────────────────────────
/// Every monitor with its current average.

pub async fn get_monitors(State(report): State<ReportState>) -> Json<RegistrySnapshot> {
    Json(report.snapshot())
}

// ─── GET /api/monitors/keys ──────────────────────────────────────

pub async fn get_keys(State(report): State<ReportState>) -> Json<BTreeSet<String>> {
    Json(report.list_keys())
}

// ─── GET /api/monitors/:key ──────────────────────────────────────
/// Single average; unknown keys are a 404, never a silent zero.

pub async fn get_monitor(
    State(report): State<ReportState>,
    Path(key): Path<String>,
) -> Result<Json<MonitorAverage>, MonitorError> {
    let average = report.get_average(&key)?;
    Ok(Json(MonitorAverage { key, average }))
}

// ─── GET /api/monitors/stream ────────────────────────────────────
/// Server-Sent Events endpoint.
/// `averages` events carry a full snapshot every 500 ms; `keys-changed`
/// events fire as soon as a monitor is added after startup.

pub async fn monitors_stream(
    State(report): State<ReportState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let changes = BroadcastStream::new(report.subscribe()).filter_map(|change| {
        // A lagging subscriber skips missed changes; the next one carries
        // the full key set anyway.
        let change = change.ok()?;
        let json = serde_json::to_string(&change).unwrap_or_default();
        Some(Ok::<_, Infallible>(
            Event::default().event("keys-changed").data(json),
        ))
    });

    let interval = tokio::time::interval(Duration::from_millis(STREAM_INTERVAL_MS));
    let averages = IntervalStream::new(interval).map(move |_| {
        let snapshot = report.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap_or_default();
        Ok::<_, Infallible>(Event::default().event("averages").data(json))
    });

    Sse::new(averages.merge(changes)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
