//! Handler-style dispatch: a call arrives as (method identity, arguments)
//! instead of a typed method call, and the source routes it itself.

use serde_json::Value;
use tracing::debug;

use super::naming::Method;
use super::timing::LatencyMonitored;
use crate::error::{CallError, MonitorError};

/// Why a dispatched call did not produce a value.
#[derive(Debug)]
pub enum DispatchError<E> {
    /// The implementation ran and failed.
    Failed(E),
    /// The arguments could not be bound to the method.
    Arguments(String),
}

/// A source that accepts calls by method identity with JSON arguments.
pub trait Dispatch {
    type Error;

    fn dispatch(
        &self,
        method: &Method,
        args: &[Value],
    ) -> std::result::Result<Value, DispatchError<Self::Error>>;
}

impl<S: Dispatch> LatencyMonitored<S> {
    /// Finds a proxied method by interface (full or simple name), method name
    /// and parameter type list.
    pub fn resolve(
        &self,
        interface: &str,
        name: &str,
        params: &[&str],
    ) -> crate::Result<Method> {
        self.interfaces()
            .iter()
            .filter(|iface| iface.name == interface || iface.simple_name() == interface)
            .flat_map(|iface| iface.methods.iter())
            .find(|m| m.name == name && m.params == params)
            .copied()
            .ok_or_else(|| {
                MonitorError::InternalDispatch(format!(
                    "no method {name}({}) on proxied interface {interface}",
                    params.join(",")
                ))
            })
    }

    /// Routes `args` to `method` on the source, timing it like `invoke`.
    ///
    /// Methods outside the proxied interfaces and arity or binding mismatches
    /// are `CallError::Internal`; the source's own failures come back as
    /// `CallError::Failed` holding its error unchanged. Neither records a sample.
    pub fn dispatch(
        &self,
        method: &Method,
        args: &[Value],
    ) -> std::result::Result<Value, CallError<S::Error>> {
        let declared = self
            .declaring_interface(method)
            .is_some_and(|iface| iface.declares(method));
        if !declared {
            return Err(MonitorError::InternalDispatch(format!(
                "{method} is not declared by any proxied interface"
            ))
            .into());
        }
        if args.len() != method.params.len() {
            return Err(MonitorError::InternalDispatch(format!(
                "{method} takes {} argument(s), got {}",
                method.params.len(),
                args.len()
            ))
            .into());
        }

        self.invoke(method, |source| source.dispatch(method, args))
            .map_err(|e| match e {
                DispatchError::Failed(e) => CallError::Failed(e),
                DispatchError::Arguments(msg) => {
                    debug!(method = %method, error = %msg, "argument binding failed");
                    CallError::Internal(MonitorError::InternalDispatch(msg))
                }
            })
    }
}
