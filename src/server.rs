use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use latency_proxy::metrics::stream::{self, ReportState};

use crate::handlers;
use crate::AppState;

/// Builds the full Axum `Router`: catalog calls, load control, and the
/// monitor report routes for the catalog's registry.
pub fn create_router(state: Arc<AppState>) -> Router {
    let report: ReportState = state.catalog.registry().clone();

    Router::new()
        // ── User endpoints ──────────────────────────────────────
        .route("/api/users/:id", get(handlers::catalog::get_user))
        .route("/api/users", post(handlers::catalog::create_user))
        // ── Session endpoints ───────────────────────────────────
        .route("/api/sessions/:id", get(handlers::catalog::get_session))
        .route("/api/sessions", post(handlers::catalog::create_session))
        // ── Load control ────────────────────────────────────────
        .route("/api/load/start", post(handlers::load::start_load))
        .route("/api/load/stop", post(handlers::load::stop_load))
        .route("/api/load/status", get(handlers::load::load_status))
        // ── Provide shared state to all routes above ────────────
        .with_state(state)
        // ── Monitor report (carries its own state) ──────────────
        .merge(stream::router(report))
        .layer(CorsLayer::permissive())
}
