use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

// ─── Monitoring-layer errors ─────────────────────────────────────

/// Failures raised by the monitoring layer itself.
///
/// A wrapped call's own error never ends up here; see [`CallError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    /// Bad sample size, unknown naming policy, unparsable env value.
    /// Always raised at construction time, never per call.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("{0} is not a valid attribute")]
    AttributeNotFound(String),

    /// The interception machinery could not route a call to the source.
    #[error("internal dispatch failure: {0}")]
    InternalDispatch(String),
}

pub type Result<T> = std::result::Result<T, MonitorError>;

// ─── Dynamic dispatch outcome ────────────────────────────────────

/// Result error of [`LatencyMonitored::dispatch`](crate::LatencyMonitored::dispatch).
///
/// Keeps "your logic failed" (`Failed`, carrying the source's error as-is)
/// apart from "the monitoring layer is broken" (`Internal`).
#[derive(Debug, Error)]
pub enum CallError<E> {
    #[error("wrapped call failed: {0}")]
    Failed(E),

    #[error(transparent)]
    Internal(#[from] MonitorError),
}

impl<E> CallError<E> {
    /// The wrapped call's error, if that is what failed.
    pub fn into_failed(self) -> Option<E> {
        match self {
            Self::Failed(e) => Some(e),
            Self::Internal(_) => None,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

// ─── HTTP mapping for the reporting adapter ──────────────────────

impl IntoResponse for MonitorError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::AttributeNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidConfiguration(_) => StatusCode::BAD_REQUEST,
            Self::InternalDispatch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error":  self.to_string(),
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}
