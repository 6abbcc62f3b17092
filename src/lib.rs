//! Per-call-site latency sampling for proxied interfaces.
//!
//! A [`LatencyMonitored`] wraps a source object; each call routed through it
//! is timed and, when it succeeds, recorded into a fixed-size [`RingBuffer`]
//! owned by the [`LatencyMonitor`] for that call-site. Monitors live in a
//! [`MonitorRegistry`] keyed by a [`NamingStrategy`]-derived string, and the
//! registry is read through the [`LatencyReport`] trait by reporting
//! adapters such as the HTTP routes in [`metrics::stream`].

pub mod config;
pub mod error;
pub mod metrics;
pub mod proxy;

pub use config::MonitorConfig;
pub use error::{CallError, MonitorError, Result};
pub use metrics::{
    KeySetChanged, LatencyMonitor, LatencyReport, MonitorRegistry, MonitorSnapshot,
    RegistrySnapshot, RingBuffer, TimeUnit,
};
pub use proxy::{
    Dispatch, DispatchError, Interface, LatencyMonitored, Method, MethodNameOnly, NamingPolicy,
    NamingStrategy, QualifiedNaming,
};
