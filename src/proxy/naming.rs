//! Call-site identity: interface/method descriptors and the strategies that
//! turn them into registry keys.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};

// ─── Descriptors ─────────────────────────────────────────────────

/// One method of a proxied interface.
///
/// `interface` is the fully qualified name of the declaring interface and
/// `params` the fully qualified parameter type names, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Method {
    pub interface: &'static str,
    pub name: &'static str,
    pub params: &'static [&'static str],
}

impl Method {
    pub const fn new(
        interface: &'static str,
        name: &'static str,
        params: &'static [&'static str],
    ) -> Self {
        Self {
            interface,
            name,
            params,
        }
    }

    /// `name(p1,p2)`
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.params.join(","))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.interface, self.signature())
    }
}

/// An interface the monitored source implements, with its full method set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interface {
    pub name: &'static str,
    pub methods: &'static [Method],
}

impl Interface {
    pub const fn new(name: &'static str, methods: &'static [Method]) -> Self {
        Self { name, methods }
    }

    /// Last path segment of the interface name.
    pub fn simple_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }

    pub fn declares(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }
}

// ─── Strategies ──────────────────────────────────────────────────

/// Maps a call-site to the key its samples are grouped under.
///
/// Implementations must be pure: the same inputs always give the same key.
pub trait NamingStrategy: Send + Sync {
    fn attribute_name(
        &self,
        source: &str,
        interfaces: &[Interface],
        interface: &Interface,
        method: &Method,
    ) -> String;
}

/// `Interface::method(p1,p2)` when more than one interface is proxied,
/// `method(p1,p2)` otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualifiedNaming;

impl NamingStrategy for QualifiedNaming {
    fn attribute_name(
        &self,
        _source: &str,
        interfaces: &[Interface],
        interface: &Interface,
        method: &Method,
    ) -> String {
        if interfaces.len() > 1 {
            format!("{}::{}", interface.simple_name(), method.signature())
        } else {
            method.signature()
        }
    }
}

/// Bare method name. Only safe when the interfaces never overload a name.
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodNameOnly;

impl NamingStrategy for MethodNameOnly {
    fn attribute_name(
        &self,
        _source: &str,
        _interfaces: &[Interface],
        _interface: &Interface,
        method: &Method,
    ) -> String {
        method.name.to_owned()
    }
}

// ─── Strategy table ──────────────────────────────────────────────

/// Built-in strategies selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamingPolicy {
    #[default]
    Qualified,
    MethodName,
}

impl NamingPolicy {
    pub fn strategy(self) -> Arc<dyn NamingStrategy> {
        match self {
            Self::Qualified => Arc::new(QualifiedNaming),
            Self::MethodName => Arc::new(MethodNameOnly),
        }
    }
}

impl FromStr for NamingPolicy {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "qualified" | "default" => Ok(Self::Qualified),
            "method-name" | "method_name" | "simple" => Ok(Self::MethodName),
            other => Err(MonitorError::InvalidConfiguration(format!(
                "unknown naming strategy '{other}'"
            ))),
        }
    }
}
