//! [`TelemetryClient`]: connects to telemetryd over gRPC.

use futures_util::Stream;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};

use crate::server::proto::HealthRequest;
use crate::server::proto::telemetry_client::TelemetryClient as TelemetryGrpcClient;
use crate::{ParticleState, Result, TelemetryError};

/// A client for the telemetry ingestion service.
#[derive(Debug, Clone)]
pub struct TelemetryClient {
    inner: TelemetryGrpcClient<Channel>,
}

impl TelemetryClient {
    /// Connect over plain TCP.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let client = TelemetryClient::connect("http://127.0.0.1:10000").await?;
    /// ```
    pub async fn connect(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        let endpoint = endpoint(&addr)?;
        Self::open(endpoint, &addr).await
    }

    /// Connect over TLS, trusting `ca_pem` and expecting `domain` in the
    /// server certificate.
    pub async fn connect_tls(
        addr: impl Into<String>,
        ca_pem: &[u8],
        domain: &str,
    ) -> Result<Self> {
        let addr = addr.into();
        let tls = ClientTlsConfig::new()
            .ca_certificate(Certificate::from_pem(ca_pem))
            .domain_name(domain);
        let endpoint = endpoint(&addr)?
            .tls_config(tls)
            .map_err(|e| TelemetryError::Transport(format!("invalid TLS configuration: {e}")))?;
        Self::open(endpoint, &addr).await
    }

    async fn open(endpoint: Endpoint, addr: &str) -> Result<Self> {
        let channel = endpoint
            .connect()
            .await
            .map_err(|e| TelemetryError::Transport(format!("failed to connect to {addr}: {e}")))?;
        Ok(Self {
            inner: TelemetryGrpcClient::new(channel),
        })
    }

    /// Cast every state as one stream; returns the server's count.
    pub async fn cast<I>(&self, states: I) -> Result<u64>
    where
        I: IntoIterator<Item = ParticleState>,
        I::IntoIter: Send + 'static,
    {
        self.cast_stream(futures_util::stream::iter(states)).await
    }

    /// Cast states as they are produced. The stream ending is the
    /// end-of-stream signal.
    pub async fn cast_stream<S>(&self, states: S) -> Result<u64>
    where
        S: Stream<Item = ParticleState> + Send + 'static,
    {
        let response = self
            .inner
            .clone()
            .cast_particle_state(states)
            .await
            .map_err(from_status)?;
        Ok(response.into_inner().num_states)
    }

    /// Returns `(healthy, version, git_sha)`.
    pub async fn health(&self) -> Result<(bool, String, Option<String>)> {
        let response = self
            .inner
            .clone()
            .health(HealthRequest {})
            .await
            .map_err(from_status)?
            .into_inner();
        Ok((response.healthy, response.version, response.git_sha))
    }
}

fn endpoint(addr: &str) -> Result<Endpoint> {
    Endpoint::from_shared(addr.to_string())
        .map_err(|e| TelemetryError::Configuration(format!("invalid server address {addr}: {e}")))
}

/// Convert [`tonic::Status`] to [`TelemetryError`].
pub fn from_status(status: tonic::Status) -> TelemetryError {
    match status.code() {
        // tonic reports connection-level failures as Unavailable.
        tonic::Code::Unavailable => TelemetryError::Transport(status.message().to_string()),
        _ => status.into(),
    }
}
