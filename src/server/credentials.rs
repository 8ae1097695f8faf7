//! Transport security resolution.
//!
//! Decides, before any socket is bound, whether the listener speaks plain
//! TCP or TLS. TLS material is read and parsed up front so a bad path or a
//! malformed PEM stops startup instead of surfacing on the first handshake.

use std::path::{Path, PathBuf};

use tonic::transport::{Identity, ServerTlsConfig};
use tracing::warn;

use super::config::ServerConfig;
use crate::{Result, TelemetryError};

/// Bundled development certificate for `localhost` / `127.0.0.1`.
///
/// The private key ships in the repository. Never use it outside local testing.
pub const DEV_CERT_PEM: &[u8] = include_bytes!("../../certs/server.pem");

/// Private key matching [`DEV_CERT_PEM`].
pub const DEV_KEY_PEM: &[u8] = include_bytes!("../../certs/server.key");

/// CA that issued [`DEV_CERT_PEM`], for clients talking to a dev server.
pub const DEV_CA_PEM: &[u8] = include_bytes!("../../certs/ca.pem");

/// Where TLS material came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Files { cert: PathBuf, key: PathBuf },
    BundledDevelopment,
}

/// Parsed certificate chain and key, ready to hand to the listener.
#[derive(Clone)]
pub struct TlsCredentials {
    cert_pem: Vec<u8>,
    key_pem: Vec<u8>,
    source: CredentialSource,
}

impl std::fmt::Debug for TlsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsCredentials")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl TlsCredentials {
    /// Load a PEM certificate chain and private key from disk.
    pub fn from_files(cert: &Path, key: &Path) -> Result<Self> {
        let cert_pem = read_pem(cert)?;
        let key_pem = read_pem(key)?;
        Self::from_pem(
            cert_pem,
            key_pem,
            CredentialSource::Files {
                cert: cert.to_path_buf(),
                key: key.to_path_buf(),
            },
        )
    }

    /// The bundled, publicly known development pair.
    pub fn development() -> Result<Self> {
        Self::from_pem(
            DEV_CERT_PEM.to_vec(),
            DEV_KEY_PEM.to_vec(),
            CredentialSource::BundledDevelopment,
        )
    }

    fn from_pem(cert_pem: Vec<u8>, key_pem: Vec<u8>, source: CredentialSource) -> Result<Self> {
        let (cert_path, key_path) = match &source {
            CredentialSource::Files { cert, key } => (cert.clone(), key.clone()),
            CredentialSource::BundledDevelopment => {
                (PathBuf::from("<bundled>"), PathBuf::from("<bundled>"))
            }
        };

        let certs = rustls_pemfile::certs(&mut cert_pem.as_slice())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| TelemetryError::CredentialLoad {
                path: cert_path.clone(),
                reason: format!("invalid PEM: {e}"),
            })?;
        if certs.is_empty() {
            return Err(TelemetryError::CredentialLoad {
                path: cert_path,
                reason: "no certificates found".to_string(),
            });
        }

        match rustls_pemfile::private_key(&mut key_pem.as_slice()) {
            Ok(Some(_)) => {}
            Ok(None) => {
                return Err(TelemetryError::CredentialLoad {
                    path: key_path,
                    reason: "no private key found".to_string(),
                });
            }
            Err(e) => {
                return Err(TelemetryError::CredentialLoad {
                    path: key_path,
                    reason: format!("invalid PEM: {e}"),
                });
            }
        }

        Ok(Self {
            cert_pem,
            key_pem,
            source,
        })
    }

    pub fn source(&self) -> &CredentialSource {
        &self.source
    }

    /// Build the tonic server TLS configuration.
    pub fn server_tls_config(&self) -> ServerTlsConfig {
        ServerTlsConfig::new().identity(Identity::from_pem(&self.cert_pem, &self.key_pem))
    }
}

fn read_pem(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| TelemetryError::CredentialLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// How the listener secures its connections.
#[derive(Debug, Clone)]
pub enum TransportSecurity {
    Plaintext,
    Tls(TlsCredentials),
}

impl TransportSecurity {
    /// Resolve transport security from configuration.
    ///
    /// With TLS enabled and either path empty, the bundled development pair
    /// is used for both halves so certificate and key always match.
    pub fn resolve(config: &ServerConfig) -> Result<Self> {
        if !config.tls {
            return Ok(Self::Plaintext);
        }

        let cert_empty = config.cert_file.as_os_str().is_empty();
        let key_empty = config.key_file.as_os_str().is_empty();
        if cert_empty || key_empty {
            if cert_empty != key_empty {
                warn!(
                    cert_file = ?config.cert_file,
                    key_file = ?config.key_file,
                    "only one of cert_file/key_file given; ignoring it"
                );
            }
            warn!("using bundled development TLS certificate; not for production use");
            return Ok(Self::Tls(TlsCredentials::development()?));
        }

        Ok(Self::Tls(TlsCredentials::from_files(
            &config.cert_file,
            &config.key_file,
        )?))
    }

    pub fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    pub fn server_tls_config(&self) -> Option<ServerTlsConfig> {
        match self {
            Self::Plaintext => None,
            Self::Tls(creds) => Some(creds.server_tls_config()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tls_config(cert: &Path, key: &Path) -> ServerConfig {
        ServerConfig {
            tls: true,
            cert_file: cert.to_path_buf(),
            key_file: key.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn plaintext_when_tls_disabled() {
        let config = ServerConfig {
            // Paths are ignored without tls.
            cert_file: PathBuf::from("/nonexistent.pem"),
            ..Default::default()
        };
        let security = TransportSecurity::resolve(&config).unwrap();
        assert!(!security.is_tls());
        assert!(security.server_tls_config().is_none());
    }

    #[test]
    fn empty_paths_fall_back_to_bundled_pair() {
        let config = ServerConfig {
            tls: true,
            ..Default::default()
        };
        match TransportSecurity::resolve(&config).unwrap() {
            TransportSecurity::Tls(creds) => {
                assert_eq!(creds.source(), &CredentialSource::BundledDevelopment)
            }
            TransportSecurity::Plaintext => panic!("expected TLS"),
        }
    }

    #[test]
    fn one_empty_path_also_falls_back() {
        let config = ServerConfig {
            tls: true,
            cert_file: PathBuf::from("/some/cert.pem"),
            ..Default::default()
        };
        let security = TransportSecurity::resolve(&config).unwrap();
        match security {
            TransportSecurity::Tls(creds) => {
                assert_eq!(creds.source(), &CredentialSource::BundledDevelopment)
            }
            TransportSecurity::Plaintext => panic!("expected TLS"),
        }
    }

    #[test]
    fn loads_pair_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("server.pem");
        let key = dir.path().join("server.key");
        std::fs::write(&cert, DEV_CERT_PEM).unwrap();
        std::fs::write(&key, DEV_KEY_PEM).unwrap();

        let security = TransportSecurity::resolve(&tls_config(&cert, &key)).unwrap();
        match security {
            TransportSecurity::Tls(creds) => assert_eq!(
                creds.source(),
                &CredentialSource::Files {
                    cert: cert.clone(),
                    key: key.clone()
                }
            ),
            TransportSecurity::Plaintext => panic!("expected TLS"),
        }
    }

    #[test]
    fn missing_cert_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("server.key");
        std::fs::write(&key, DEV_KEY_PEM).unwrap();
        let cert = dir.path().join("missing.pem");

        let err = TransportSecurity::resolve(&tls_config(&cert, &key)).unwrap_err();
        match err {
            TelemetryError::CredentialLoad { path, .. } => assert_eq!(path, cert),
            other => panic!("expected CredentialLoad, got {other:?}"),
        }
    }

    #[test]
    fn garbage_cert_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("server.pem");
        let key = dir.path().join("server.key");
        std::fs::write(&cert, b"this is not a certificate").unwrap();
        std::fs::write(&key, DEV_KEY_PEM).unwrap();

        let err = TransportSecurity::resolve(&tls_config(&cert, &key)).unwrap_err();
        assert!(matches!(err, TelemetryError::CredentialLoad { .. }));
        assert!(err.to_string().contains("no certificates found"));
    }

    #[test]
    fn cert_in_key_slot_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("server.pem");
        let key = dir.path().join("server.key");
        std::fs::write(&cert, DEV_CERT_PEM).unwrap();
        std::fs::write(&key, DEV_CERT_PEM).unwrap();

        let err = TransportSecurity::resolve(&tls_config(&cert, &key)).unwrap_err();
        match err {
            TelemetryError::CredentialLoad { path, reason } => {
                assert_eq!(path, key);
                assert!(reason.contains("no private key"));
            }
            other => panic!("expected CredentialLoad, got {other:?}"),
        }
    }

    #[test]
    fn credential_errors_are_fatal() {
        let err = TlsCredentials::from_files(
            Path::new("/nonexistent/cert.pem"),
            Path::new("/nonexistent/key.pem"),
        )
        .unwrap_err();
        assert!(err.is_fatal());
    }
}
