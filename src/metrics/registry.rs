use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use super::monitor::{LatencyMonitor, TimeUnit};
use crate::error::{MonitorError, Result};

// ─── Configuration ───────────────────────────────────────────────

/// Buffered change notifications per subscriber before it starts lagging.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

// ─── Public types ────────────────────────────────────────────────

/// Emitted when a key is added after startup, so observers can refresh.
#[derive(Debug, Clone, Serialize)]
pub struct KeySetChanged {
    pub sequence: u64,
    pub source: String,
    pub key_added: String,
    /// Full key set after the addition, sorted.
    pub keys: Vec<String>,
    pub emitted_at: DateTime<Utc>,
}

/// Per-key view shipped to reporting clients.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorSnapshot {
    pub key: String,
    pub average: u64,
    /// `"<average> <unit>"`
    pub value: String,
    pub samples_recorded: u64,
}

/// Complete read-only view of a registry.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrySnapshot {
    pub name: String,
    pub source: String,
    pub unit: TimeUnit,
    pub sample_size: usize,
    pub monitors: Vec<MonitorSnapshot>,
}

/// Narrow read + subscribe surface handed to reporting adapters.
pub trait LatencyReport: Send + Sync {
    fn list_keys(&self) -> BTreeSet<String>;

    /// Average for `key` in the registry's unit.
    fn get_average(&self, key: &str) -> Result<u64>;

    fn snapshot(&self) -> RegistrySnapshot;

    fn subscribe(&self) -> broadcast::Receiver<KeySetChanged>;
}

// ─── MonitorRegistry ─────────────────────────────────────────────

/// Concurrent key → monitor map for one monitored source.
///
/// Keys are never removed; the registry lives as long as its proxy.
pub struct MonitorRegistry {
    name: String,
    source: String,
    sample_size: NonZeroUsize,
    unit: TimeUnit,
    monitors: DashMap<String, Arc<LatencyMonitor>>,
    /// Set once the known keys were created up front; from then on late
    /// keys are added silently.
    populated_at_startup: AtomicBool,
    sequence: AtomicU64,
    changes: broadcast::Sender<KeySetChanged>,
}

impl MonitorRegistry {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        sample_size: usize,
        unit: TimeUnit,
    ) -> Result<Self> {
        let sample_size = NonZeroUsize::new(sample_size).ok_or_else(|| {
            MonitorError::InvalidConfiguration("sample size must be greater than zero".into())
        })?;
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        Ok(Self {
            name: name.into(),
            source: source.into(),
            sample_size,
            unit,
            monitors: DashMap::new(),
            populated_at_startup: AtomicBool::new(false),
            sequence: AtomicU64::new(0),
            changes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    /// Returns the canonical monitor for `key`, creating it if absent.
    ///
    /// Racing callers for a new key all get the same instance; only the one
    /// that inserted it announces the grown key set, and only when the
    /// registry was not populated at startup.
    pub fn get_or_create(&self, key: &str) -> Arc<LatencyMonitor> {
        if let Some(existing) = self.monitors.get(key) {
            return Arc::clone(existing.value());
        }

        // The shard guard is released at the end of this statement, before
        // the notification below walks the map.
        let (monitor, created) = match self.monitors.entry(key.to_owned()) {
            Entry::Occupied(e) => (Arc::clone(e.get()), false),
            Entry::Vacant(e) => {
                let monitor = Arc::new(self.new_monitor());
                e.insert(Arc::clone(&monitor));
                (monitor, true)
            }
        };

        if created {
            debug!(registry = %self.name, key, "created latency monitor");
            if !self.populated_at_startup() {
                self.notify_key_added(key);
            }
        }
        monitor
    }

    /// Creates a monitor for every key up front, without notifications.
    ///
    /// This switches the registry into startup-populated mode: keys created
    /// later by [`get_or_create`](Self::get_or_create) are not announced.
    pub fn pre_create_all<I, K>(&self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.populated_at_startup.store(true, Ordering::Release);
        for key in keys {
            let key = key.into();
            if let Entry::Vacant(e) = self.monitors.entry(key) {
                debug!(registry = %self.name, key = %e.key(), "pre-created latency monitor");
                e.insert(Arc::new(self.new_monitor()));
            }
        }
    }

    pub fn populated_at_startup(&self) -> bool {
        self.populated_at_startup.load(Ordering::Acquire)
    }

    pub fn get(&self, key: &str) -> Option<Arc<LatencyMonitor>> {
        self.monitors.get(key).map(|m| Arc::clone(m.value()))
    }

    /// Averages of every key present at call time.
    pub fn snapshot_averages(&self) -> BTreeMap<String, u64> {
        self.monitors
            .iter()
            .map(|e| (e.key().clone(), e.value().average()))
            .collect()
    }

    /// Bulk tolerant read: unknown keys yield `None` instead of an error.
    pub fn averages<'a>(
        &self,
        keys: impl IntoIterator<Item = &'a str>,
    ) -> Vec<(String, Option<u64>)> {
        keys.into_iter()
            .map(|key| (key.to_owned(), self.get(key).map(|m| m.average())))
            .collect()
    }

    /// Formatted `"<average> <unit>"` for `key`.
    ///
    /// With `suppress_not_found` an unknown key reads as an empty string
    /// instead of `AttributeNotFound`.
    pub fn latency_value(&self, key: &str, suppress_not_found: bool) -> Result<String> {
        match self.get(key) {
            Some(monitor) => Ok(self.format_average(monitor.average())),
            None if suppress_not_found => Ok(String::new()),
            None => Err(MonitorError::AttributeNotFound(key.to_owned())),
        }
    }

    fn format_average(&self, average: u64) -> String {
        format!("{average} {}", self.unit)
    }

    fn new_monitor(&self) -> LatencyMonitor {
        LatencyMonitor::with_capacity(self.sample_size, self.unit)
    }

    fn sorted_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.monitors.iter().map(|e| e.key().clone()).collect();
        keys.sort_unstable();
        keys
    }

    fn notify_key_added(&self, key: &str) {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let event = KeySetChanged {
            sequence,
            source: self.source.clone(),
            key_added: key.to_owned(),
            keys: self.sorted_keys(),
            emitted_at: Utc::now(),
        };

        // No subscribers is the common case; nothing to do then.
        if self.changes.send(event).is_err() {
            trace!(registry = %self.name, sequence, "key-set change had no subscribers");
        }
    }
}

impl LatencyReport for MonitorRegistry {
    fn list_keys(&self) -> BTreeSet<String> {
        self.monitors.iter().map(|e| e.key().clone()).collect()
    }

    fn get_average(&self, key: &str) -> Result<u64> {
        self.get(key)
            .map(|m| m.average())
            .ok_or_else(|| MonitorError::AttributeNotFound(key.to_owned()))
    }

    fn snapshot(&self) -> RegistrySnapshot {
        let mut monitors: Vec<MonitorSnapshot> = self
            .monitors
            .iter()
            .map(|e| {
                let average = e.value().average();
                MonitorSnapshot {
                    key: e.key().clone(),
                    average,
                    value: self.format_average(average),
                    samples_recorded: e.value().samples_recorded(),
                }
            })
            .collect();
        monitors.sort_unstable_by(|a, b| a.key.cmp(&b.key));

        RegistrySnapshot {
            name: self.name.clone(),
            source: self.source.clone(),
            unit: self.unit,
            sample_size: self.sample_size.get(),
            monitors,
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<KeySetChanged> {
        self.changes.subscribe()
    }
}

impl std::fmt::Debug for MonitorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorRegistry")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("sample_size", &self.sample_size)
            .field("unit", &self.unit)
            .field("keys", &self.monitors.len())
            .field("populated_at_startup", &self.populated_at_startup())
            .finish()
    }
}
