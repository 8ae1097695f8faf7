//! Configuration for telemetryd.
//!
//! A [`ServerConfig`] is resolved once at startup and then only read.
//! Values come from three layers, later layers winning:
//! 1. Built-in defaults
//! 2. An optional TOML file (`--config <path>`)
//! 3. Command-line flags ([`ConfigOverrides`])

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use serde::Deserialize;

/// Default listener port.
pub const DEFAULT_PORT: u16 = 10000;

/// Default path handed to the summary store.
pub const DEFAULT_DATABASE: &str = "./telemetry.db";

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Serve over TLS instead of plain TCP.
    pub tls: bool,
    /// PEM certificate chain. Empty selects the bundled development pair.
    pub cert_file: PathBuf,
    /// PEM private key. Empty selects the bundled development pair.
    pub key_file: PathBuf,
    /// TCP port bound on localhost. `0` picks an ephemeral port.
    pub port: u16,
    /// Path passed to the summary store.
    pub database: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tls: false,
            cert_file: PathBuf::new(),
            key_file: PathBuf::new(),
            port: DEFAULT_PORT,
            database: PathBuf::from(DEFAULT_DATABASE),
        }
    }
}

/// Values supplied on the command line. `None` keeps the underlying value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub tls: Option<bool>,
    pub cert_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    pub port: Option<u16>,
    pub database: Option<PathBuf>,
}

impl ServerConfig {
    /// Address the listener binds: `localhost:<port>`.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, self.port))
    }

    /// Apply command-line overrides on top of this configuration.
    pub fn with_overrides(self, overrides: ConfigOverrides) -> Self {
        Self {
            tls: overrides.tls.unwrap_or(self.tls),
            cert_file: overrides.cert_file.unwrap_or(self.cert_file),
            key_file: overrides.key_file.unwrap_or(self.key_file),
            port: overrides.port.unwrap_or(self.port),
            database: overrides.database.unwrap_or(self.database),
        }
    }
}

#[cfg(feature = "server")]
impl ServerConfig {
    /// Load configuration from a TOML file. Missing keys take their defaults.
    pub fn load(path: &std::path::Path) -> crate::Result<Self> {
        use crate::TelemetryError;

        if !path.exists() {
            return Err(TelemetryError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            TelemetryError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            TelemetryError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }
}
