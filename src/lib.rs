//! Telemetry server - streaming particle-state ingestion over gRPC
//!
//! Clients open a client-streaming `CastParticleState` call, push any number
//! of particle states, then half-close the stream. The server tallies the
//! states it received and answers once with a [`CastSummary`].
//!
//! # Serving
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use telemetry_server::server::config::ServerConfig;
//! use telemetry_server::server::{TelemetryServer, TelemetryService};
//! use telemetry_server::store::FileStore;
//!
//! #[tokio::main]
//! async fn main() -> telemetry_server::Result<()> {
//!     let config = ServerConfig::default();
//!     let store = FileStore::open(&config.database).await?;
//!     let service = TelemetryService::new(Arc::new(store));
//!
//!     let server = TelemetryServer::bind(&config, service).await?;
//!     let handle = server.shutdown_handle();
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         handle.shutdown();
//!     });
//!     server.serve().await
//! }
//! ```
//!
//! # Casting (requires `client` feature)
//!
//! ```rust,ignore
//! use telemetry_server::client::TelemetryClient;
//! use telemetry_server::ParticleState;
//!
//! let client = TelemetryClient::connect("http://127.0.0.1:10000").await?;
//! let counted = client.cast(vec![ParticleState::default(); 3]).await?;
//! assert_eq!(counted, 3);
//! ```

#[cfg(feature = "client")]
pub mod client;
pub mod error;
pub mod netaddr;
pub mod server;
pub mod store;
pub mod telemetry;
pub mod version;

pub use error::{Result, TelemetryError};
pub use server::proto::{CastSummary, ParticleState};
pub use version::{PKG_VERSION, version_string};
