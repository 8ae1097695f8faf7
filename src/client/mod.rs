//! Client library for casting particle states to telemetryd.
//!
//! Provides [`TelemetryClient`], a thin wrapper over the generated gRPC
//! client that streams states and returns the server's tally.

mod service_client;

pub use service_client::{TelemetryClient, from_status};
