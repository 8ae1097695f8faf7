use std::path::PathBuf;

use telemetry_server::{Result, TelemetryError};

#[test]
fn test_error_display() {
    let err = TelemetryError::CredentialLoad {
        path: PathBuf::from("/etc/telemetry/server.pem"),
        reason: "no certificates found".to_string(),
    };
    let msg = err.to_string();
    assert!(msg.contains("server.pem"));
    assert!(msg.contains("no certificates found"));
}

#[test]
fn test_bind_error_keeps_source() {
    use std::error::Error as _;

    let err = TelemetryError::Bind {
        addr: "127.0.0.1:10000".parse().unwrap(),
        source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
    };
    assert!(err.to_string().contains("127.0.0.1:10000"));
    assert!(err.source().is_some());
}

#[test]
fn test_result_alias() {
    fn returns_error() -> Result<()> {
        Err(TelemetryError::Configuration("bad".into()))
    }
    assert!(returns_error().is_err());
}

// ============================================================================
// Fatal classification
// ============================================================================

#[test]
fn startup_errors_are_fatal() {
    assert!(
        TelemetryError::Bind {
            addr: "127.0.0.1:1".parse().unwrap(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        }
        .is_fatal()
    );
    assert!(TelemetryError::Configuration("x".into()).is_fatal());
    assert!(TelemetryError::Serve("x".into()).is_fatal());
}

#[test]
fn per_call_errors_are_not_fatal() {
    assert!(!TelemetryError::Storage("disk full".into()).is_fatal());
    assert!(!TelemetryError::Transport("reset".into()).is_fatal());
    assert!(
        !TelemetryError::Rpc {
            code: tonic::Code::Cancelled,
            message: "gone".into()
        }
        .is_fatal()
    );
}

// ============================================================================
// Status conversion
// ============================================================================

#[test]
fn status_round_trips_through_rpc_variant() {
    let status = tonic::Status::data_loss("truncated frame");
    let err: TelemetryError = status.into();
    let back: tonic::Status = err.into();
    assert_eq!(back.code(), tonic::Code::DataLoss);
    assert_eq!(back.message(), "truncated frame");
}

#[test]
fn storage_error_maps_to_unavailable() {
    let status: tonic::Status = TelemetryError::Storage("disk full".into()).into();
    assert_eq!(status.code(), tonic::Code::Unavailable);
}

#[test]
fn other_errors_map_to_internal() {
    let status: tonic::Status = TelemetryError::Serve("boom".into()).into();
    assert_eq!(status.code(), tonic::Code::Internal);
    assert!(status.message().contains("boom"));
}
