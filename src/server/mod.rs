//! gRPC server and shared proto types.
//!
//! This module provides:
//! - Generated protobuf types (`proto`) used by both server and client
//! - Server configuration (`config`) and TLS credential resolution (`credentials`)
//! - The per-call stream state machine (`session`, server-only)
//! - The gRPC service implementation (`service`, server-only)
//! - Listener ownership and graceful shutdown (`lifecycle`, `shutdown`, server-only)

pub mod config;
pub mod credentials;
#[cfg(feature = "server")]
pub mod lifecycle;
#[cfg(feature = "server")]
pub mod service;
#[cfg(feature = "server")]
pub mod session;
#[cfg(feature = "server")]
pub mod shutdown;

/// Re-exported generated proto types.
pub mod proto {
    tonic::include_proto!("telemetry.v1");
}

#[cfg(feature = "server")]
pub use lifecycle::TelemetryServer;
#[cfg(feature = "server")]
pub use service::TelemetryService;
#[cfg(feature = "server")]
pub use session::{SessionState, StreamSession};
#[cfg(feature = "server")]
pub use shutdown::{ShutdownCoordinator, ShutdownHandle};
