//! Telemetry server error types

use std::net::SocketAddr;
use std::path::PathBuf;

/// Telemetry server error types
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    // Startup errors (fatal)
    #[error("failed to load TLS credentials from {path:?}: {reason}")]
    CredentialLoad { path: PathBuf, reason: String },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Configuration(String),

    // Runtime errors
    #[error("server error: {0}")]
    Serve(String),

    #[error("transport error: {0}")]
    Transport(String),

    /// Status returned by the remote end of a call.
    #[error("rpc failed ({code:?}): {message}")]
    Rpc { code: tonic::Code, message: String },

    #[error("storage error: {0}")]
    Storage(String),

    // Data errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TelemetryError {
    /// Whether this error must stop the process before it serves traffic.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TelemetryError::CredentialLoad { .. }
                | TelemetryError::Bind { .. }
                | TelemetryError::Configuration(_)
                | TelemetryError::Serve(_)
        )
    }
}

impl From<TelemetryError> for tonic::Status {
    fn from(err: TelemetryError) -> Self {
        match err {
            TelemetryError::Rpc { code, message } => tonic::Status::new(code, message),
            TelemetryError::Storage(msg) => tonic::Status::unavailable(msg),
            TelemetryError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            other => tonic::Status::internal(other.to_string()),
        }
    }
}

impl From<tonic::Status> for TelemetryError {
    fn from(status: tonic::Status) -> Self {
        TelemetryError::Rpc {
            code: status.code(),
            message: status.message().to_string(),
        }
    }
}

/// Result type alias for telemetry server operations
pub type Result<T> = std::result::Result<T, TelemetryError>;
