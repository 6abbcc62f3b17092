use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::naming::{Interface, Method, NamingStrategy};
use crate::config::MonitorConfig;
use crate::error::Result;
use crate::metrics::MonitorRegistry;

/// A source object whose calls are timed per call-site.
///
/// Every method routed through [`invoke`](Self::invoke) or
/// [`call`](Self::call) runs the real implementation with its arguments
/// untouched; successful calls record their wall time in the monitor for the
/// call-site key, failed calls record nothing and hand the error back as-is.
///
/// An interface is proxied by implementing it for `LatencyMonitored<S>` and
/// forwarding each method:
///
/// ```no_run
/// use latency_proxy::{Interface, LatencyMonitored, Method, MonitorConfig};
///
/// trait Greeter {
///     fn greet(&self, name: &str) -> String;
/// }
///
/// const GREET: Method = Method::new("demo::Greeter", "greet", &["&str"]);
/// static GREETER: Interface = Interface::new("demo::Greeter", &[GREET]);
///
/// struct English;
/// impl Greeter for English {
///     fn greet(&self, name: &str) -> String {
///         format!("hello {name}")
///     }
/// }
///
/// impl<S: Greeter> Greeter for LatencyMonitored<S> {
///     fn greet(&self, name: &str) -> String {
///         self.call(&GREET, |s| s.greet(name))
///     }
/// }
///
/// let proxy = LatencyMonitored::new(English, &[GREETER], MonitorConfig::default()).unwrap();
/// proxy.greet("world");
/// ```
pub struct LatencyMonitored<S> {
    source: S,
    source_name: &'static str,
    interfaces: Vec<Interface>,
    naming: Arc<dyn NamingStrategy>,
    registry: Arc<MonitorRegistry>,
}

impl<S> LatencyMonitored<S> {
    /// Wraps `source`, using the naming policy from `config`.
    pub fn new(source: S, interfaces: &[Interface], config: MonitorConfig) -> Result<Self> {
        let naming = config.naming.strategy();
        Self::with_strategy(source, interfaces, config, naming)
    }

    /// Wraps `source` with a caller-supplied naming strategy.
    pub fn with_strategy(
        source: S,
        interfaces: &[Interface],
        config: MonitorConfig,
        naming: Arc<dyn NamingStrategy>,
    ) -> Result<Self> {
        config.validate()?;

        let source_name = std::any::type_name::<S>();
        let registry = Arc::new(MonitorRegistry::new(
            config.name.clone(),
            source_name,
            config.sample_size,
            config.unit,
        )?);

        let proxy = Self {
            source,
            source_name,
            interfaces: interfaces.to_vec(),
            naming,
            registry,
        };

        if config.add_all_monitors_at_startup {
            proxy.registry.pre_create_all(proxy.declared_keys());
        }

        info!(
            name = %config.name,
            source = source_name,
            interfaces = proxy.interfaces.len(),
            eager = config.add_all_monitors_at_startup,
            sample_size = config.sample_size,
            unit = %config.unit,
            "latency-monitored proxy ready"
        );
        Ok(proxy)
    }

    /// Times a fallible call. The call's own `Result` is returned unchanged.
    pub fn invoke<R, E, F>(&self, method: &Method, call: F) -> std::result::Result<R, E>
    where
        F: FnOnce(&S) -> std::result::Result<R, E>,
    {
        let start = Instant::now();
        let result = call(&self.source);

        match &result {
            Ok(_) => self.record(method, start.elapsed()),
            Err(_) => debug!(method = %method, "wrapped call failed; sample discarded"),
        }
        result
    }

    /// Times a call that cannot fail. A panic unwinds past the recorder.
    pub fn call<R, F>(&self, method: &Method, call: F) -> R
    where
        F: FnOnce(&S) -> R,
    {
        let start = Instant::now();
        let value = call(&self.source);
        self.record(method, start.elapsed());
        value
    }

    /// Key the samples of `method` are grouped under.
    pub fn key_for(&self, method: &Method) -> String {
        let interface = self.declaring_interface(method).unwrap_or_else(|| {
            warn!(
                method = %method,
                "method's declaring interface is not proxied; keying it anyway"
            );
            Interface::new(method.interface, &[])
        });
        self.naming
            .attribute_name(self.source_name, &self.interfaces, &interface, method)
    }

    /// Keys of every method on every proxied interface.
    pub fn declared_keys(&self) -> Vec<String> {
        self.interfaces
            .iter()
            .flat_map(|iface| {
                iface.methods.iter().map(move |m| {
                    self.naming
                        .attribute_name(self.source_name, &self.interfaces, iface, m)
                })
            })
            .collect()
    }

    pub fn registry(&self) -> &Arc<MonitorRegistry> {
        &self.registry
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    pub(crate) fn declaring_interface(&self, method: &Method) -> Option<Interface> {
        self.interfaces
            .iter()
            .find(|iface| iface.name == method.interface)
            .copied()
    }

    fn record(&self, method: &Method, elapsed: Duration) {
        // `Instant` never goes backwards; saturate instead of truncating.
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        let key = self.key_for(method);
        self.registry.get_or_create(&key).add_sample(nanos);
        debug!(registry = %self.registry.name(), key = %key, nanos, "recorded call duration");
    }
}

impl<S> std::fmt::Debug for LatencyMonitored<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LatencyMonitored")
            .field("source", &self.source_name)
            .field("interfaces", &self.interfaces)
            .field("registry", &self.registry)
            .finish()
    }
}
