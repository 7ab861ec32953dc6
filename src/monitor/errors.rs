//! # Monitor Errors
//!
//! Error types for the environment monitor.
//!
//! Every failure is contained inside the observer that hit it; none of these
//! variants is fatal to the process.

use thiserror::Error;

/// Result type for monitor operations
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Failures reported by the host for a single capability or request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The capability is absent on this host. Never retried.
    #[error("{0} not supported")]
    Unsupported(String),

    /// The user or host policy refused the capability
    #[error("{0} access denied")]
    PermissionDenied(String),

    /// One request failed without a definitive denial
    #[error("Transient failure: {0}")]
    Transient(String),
}

impl HostError {
    /// Unsupported capability
    pub fn unsupported(capability: impl Into<String>) -> Self {
        Self::Unsupported(capability.into())
    }

    /// Permission denied for a capability
    pub fn denied(capability: impl Into<String>) -> Self {
        Self::PermissionDenied(capability.into())
    }

    /// Transient failure
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    /// Returns true when retrying can never succeed
    pub fn is_unsupported(&self) -> bool {
        matches!(self, HostError::Unsupported(_))
    }
}

/// Monitor errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    /// The host reported a failure
    #[error(transparent)]
    Host(#[from] HostError),

    /// Both continuations of a completion were revoked before either fired
    #[error("Completion released before it resolved")]
    Released,

    /// A sink write named a key with no display target
    #[error("Sink target not found: {key}")]
    Sink { key: String },

    /// Invalid monitor configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MonitorError {
    /// Missing sink target
    pub fn sink_target(key: impl Into<String>) -> Self {
        Self::Sink { key: key.into() }
    }

    /// Returns the host failure, if this error wraps one
    pub fn host_error(&self) -> Option<&HostError> {
        match self {
            MonitorError::Host(e) => Some(e),
            _ => None,
        }
    }
}
