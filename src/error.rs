//! Unified error types for redsess with fail-open philosophy.
//!
//! Session storage is never allowed to take the host process down. When the
//! backend is unreachable, reads degrade to empty payloads and writes report
//! failure; errors are logged and retained for diagnostics rather than
//! escalated.

use std::fmt;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a connection attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectFailure {
    /// The server rejected the configured credential.
    AuthRejected,
    /// Connecting or the handshake did not finish within the timeout.
    Timeout,
    /// Nothing is listening on the configured address.
    Refused,
    /// The host name could not be resolved.
    Dns,
    /// TLS handshake or certificate validation failed.
    Tls,
    /// The configuration cannot produce a connection (bad CA file, etc).
    InvalidConfig,
    /// Any other transport error.
    Io,
    /// Unclassified failure.
    Other,
}

impl ConnectFailure {
    /// Short label used in logs and status output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthRejected => "auth_rejected",
            Self::Timeout => "timeout",
            Self::Refused => "refused",
            Self::Dns => "dns",
            Self::Tls => "tls",
            Self::InvalidConfig => "invalid_config",
            Self::Io => "io",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ConnectFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The main error type for redsess operations.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The backend has no live connection.
    #[error("backend not connected")]
    NotConnected,

    /// A connection attempt failed.
    #[error("connection failed ({kind}): {message}")]
    Connection {
        kind: ConnectFailure,
        message: String,
    },

    /// A client capability required for the connection is missing.
    #[error("backend unavailable: {message}")]
    BackendUnavailable { message: String },

    /// A command failed after the connection was established.
    #[error("backend error: {message}")]
    Backend { message: String },

    /// I/O errors from option or config file operations.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON or TOML serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Configuration loading or validation errors.
    #[error("config error: {message}")]
    Config { message: String },

    /// Lifecycle violations (starting a second session, etc).
    #[error("invalid state: {message}")]
    InvalidState { message: String },

    /// An administrative request failed nonce verification.
    #[error("forbidden: nonce verification failed for {action}")]
    Forbidden { action: String },
}

/// A specialized Result type for redsess operations.
pub type Result<T> = std::result::Result<T, SessionError>;

impl SessionError {
    /// Create a connection error.
    pub fn connection(kind: ConnectFailure, message: impl Into<String>) -> Self {
        Self::Connection {
            kind,
            message: message.into(),
        }
    }

    /// Create a backend-unavailable error.
    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            message: message.into(),
        }
    }

    /// Create a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create a forbidden error.
    pub fn forbidden(action: impl Into<String>) -> Self {
        Self::Forbidden {
            action: action.into(),
        }
    }

    /// Whether this error means the backend is simply not reachable.
    ///
    /// Callers degrade (empty read, failed write) on these instead of
    /// reporting them as faults.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            Self::NotConnected | Self::Connection { .. } | Self::BackendUnavailable { .. }
        )
    }

    /// The connect failure kind, if this is a connection error.
    pub fn connect_failure(&self) -> Option<ConnectFailure> {
        match self {
            Self::Connection { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<io::Error> for SessionError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Trait for fail-open error handling.
///
/// Log the error and hand back a safe value instead of propagating.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    /// Handle an error by logging a warning and returning the provided fallback.
    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using fallback)", context, err);
                fallback
            }
        }
    }
}

/// Exit codes for the redsess CLI.
pub mod exit_codes {
    /// The requested operation succeeded.
    pub const SUCCESS: i32 = 0;

    /// The operation ran but reported failure (e.g. connection refused).
    pub const FAILURE: i32 = 1;

    /// The process panicked.
    pub const CRASH: i32 = 3;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_connected_display() {
        assert_eq!(
            SessionError::NotConnected.to_string(),
            "backend not connected"
        );
    }

    #[test]
    fn test_connection_error_display() {
        let err = SessionError::connection(ConnectFailure::Refused, "Connection refused (os error 111)");
        assert_eq!(
            err.to_string(),
            "connection failed (refused): Connection refused (os error 111)"
        );
        assert_eq!(err.connect_failure(), Some(ConnectFailure::Refused));
    }

    #[test]
    fn test_storage_error_display() {
        let err = SessionError::storage(
            "/tmp/options.json",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("storage error"));
        assert!(err.to_string().contains("/tmp/options.json"));
    }

    #[test]
    fn test_forbidden_display() {
        let err = SessionError::forbidden("redsess_enable_sessions");
        assert_eq!(
            err.to_string(),
            "forbidden: nonce verification failed for redsess_enable_sessions"
        );
    }

    #[test]
    fn test_is_unreachable() {
        assert!(SessionError::NotConnected.is_unreachable());
        assert!(SessionError::connection(ConnectFailure::Timeout, "t").is_unreachable());
        assert!(SessionError::backend_unavailable("no tls").is_unreachable());
        assert!(!SessionError::backend("WRONGTYPE").is_unreachable());
        assert!(!SessionError::config("bad port").is_unreachable());
    }

    #[test]
    fn test_connect_failure_labels() {
        assert_eq!(ConnectFailure::AuthRejected.as_str(), "auth_rejected");
        assert_eq!(ConnectFailure::Dns.to_string(), "dns");
        assert_eq!(
            serde_json::to_string(&ConnectFailure::InvalidConfig).unwrap(),
            "\"invalid_config\""
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: SessionError = io_err.into();
        assert!(matches!(err, SessionError::Storage { .. }));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err: SessionError = json_err.into();
        assert!(matches!(err, SessionError::Serde { .. }));
    }

    #[test]
    fn test_fail_open_default() {
        let result: Result<Vec<u8>> = Err(SessionError::NotConnected);
        assert!(result.fail_open_default("reading session").is_empty());
    }

    #[test]
    fn test_fail_open_with() {
        let result: Result<bool> = Err(SessionError::backend("boom"));
        assert!(!result.fail_open_with("writing session", false));
    }

    #[test]
    fn test_fail_open_success() {
        let result: Result<u32> = Ok(7);
        assert_eq!(result.fail_open_default("ctx"), 7);
    }
}
