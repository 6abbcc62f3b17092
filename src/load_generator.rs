use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::catalog::{self, SessionStore, UserDirectory};
use crate::MonitoredCatalog;

// ─── Public entry point ──────────────────────────────────────────

/// Spawns `concurrency` Tokio tasks that call through the monitored
/// catalog until the deadline or the `running` flag is set to false.
pub async fn run(
    running: Arc<AtomicBool>,
    catalog: Arc<MonitoredCatalog>,
    concurrency: u32,
    duration_secs: u64,
    read_pct: u8,
) {
    let deadline = Instant::now() + Duration::from_secs(duration_secs);

    let mut handles = Vec::with_capacity(concurrency as usize);

    for worker_id in 0..concurrency {
        let running = running.clone();
        let catalog = catalog.clone();

        handles.push(tokio::spawn(async move {
            worker(worker_id, running, catalog, deadline, read_pct).await;
        }));
    }

    let failed = join_workers(handles).await;

    // Mark the run as finished
    running.store(false, Ordering::SeqCst);
    info!(concurrency, duration_secs, failed, "load run finished");
}

/// Waits for every worker; returns how many panicked or were cancelled.
async fn join_workers(handles: Vec<JoinHandle<()>>) -> usize {
    let mut failed = 0;
    for h in handles {
        if let Err(e) = h.await {
            warn!(error = %e, "load worker did not finish cleanly");
            failed += 1;
        }
    }
    failed
}

// ─── Worker loop ─────────────────────────────────────────────────

async fn worker(
    id: u32,
    running: Arc<AtomicBool>,
    catalog: Arc<MonitoredCatalog>,
    deadline: Instant,
    read_pct: u8,
) {
    // Each worker gets its own deterministic RNG seeded uniquely.
    let mut rng = StdRng::seed_from_u64(1000 + id as u64);
    let mut sessions: Vec<String> = Vec::new();
    let mut calls = 0u64;

    while running.load(Ordering::Relaxed) && Instant::now() < deadline {
        let is_read = rng.gen_range(0u8..100) < read_pct;

        if is_read {
            do_read(&mut rng, &catalog, &sessions);
        } else if let Some(session) = do_write(&mut rng, &catalog) {
            sessions.push(session);
        }
        calls += 1;

        // Catalog calls are synchronous; let other tasks run between them.
        tokio::time::sleep(Duration::from_micros(rng.gen_range(50..500))).await;
    }

    debug!(worker = id, calls, "load worker stopped");
}

// ─── Read operation ──────────────────────────────────────────────

fn do_read(rng: &mut StdRng, catalog: &MonitoredCatalog, sessions: &[String]) {
    // 70 % user lookups (a few of them misses), 30 % session lookups
    if sessions.is_empty() || rng.gen_bool(0.7) {
        let n = rng.gen_range(1..=10_500u32);
        let _ = catalog.get_user(&catalog::user_id(n));
    } else {
        let id = &sessions[rng.gen_range(0..sessions.len())];
        let _ = catalog.get_session(id);
    }
}

// ─── Write operation ─────────────────────────────────────────────

/// Returns the id of a newly created session, if one was created.
fn do_write(rng: &mut StdRng, catalog: &MonitoredCatalog) -> Option<String> {
    if rng.gen_bool(0.5) {
        let user_id = catalog::user_id(rng.gen_range(1..=10_000u32));
        catalog.create_session(&user_id).ok().map(|s| s.id)
    } else {
        let i = rng.gen_range(10_001..=99_999u32);
        catalog.create_user("Bench User", &format!("bench{i}@test.com"));
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn panicking_worker_is_counted_not_swallowed() {
        let handles = vec![
            tokio::spawn(async {}),
            tokio::spawn(async { panic!("worker blew up") }),
            tokio::spawn(async {}),
        ];
        assert_eq!(join_workers(handles).await, 1);
    }
}
