//! Listener ownership: bind, serve, graceful stop.
//!
//! The listening socket lives in a dedicated accept task that forwards
//! connections to tonic. When shutdown is requested that task exits and
//! drops the socket, so new connection attempts are refused right away
//! while tonic drains the connections it already has.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::Server;
use tracing::{debug, info, warn};

use super::config::ServerConfig;
use super::credentials::TransportSecurity;
use super::proto::telemetry_server::TelemetryServer as TelemetryGrpcServer;
use super::service::TelemetryService;
use super::shutdown::ShutdownHandle;
use crate::{Result, TelemetryError};

/// Connections accepted but not yet picked up by tonic.
const ACCEPT_QUEUE: usize = 64;

/// Pause after a failed `accept` (e.g. out of file descriptors).
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// A bound, not yet serving, telemetry server.
#[derive(Debug)]
pub struct TelemetryServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    security: TransportSecurity,
    service: TelemetryService,
    shutdown: ShutdownHandle,
}

impl TelemetryServer {
    /// Resolve transport credentials, then bind `localhost:<port>`.
    ///
    /// Credentials are loaded first so a bad certificate never leaves a
    /// socket bound.
    pub async fn bind(config: &ServerConfig, service: TelemetryService) -> Result<Self> {
        let security = TransportSecurity::resolve(config)?;

        let addr = config.bind_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TelemetryError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| TelemetryError::Bind { addr, source })?;

        debug!(%local_addr, tls = security.is_tls(), "listener bound");

        Ok(Self {
            listener,
            local_addr,
            security,
            service,
            shutdown: ShutdownHandle::new(),
        })
    }

    /// Address actually bound. Differs from the configured one for port `0`.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Whether the listener terminates TLS.
    pub fn is_tls(&self) -> bool {
        self.security.is_tls()
    }

    /// Replace the service that will answer calls once serving starts.
    ///
    /// Lets the daemon open its database only after the listener is bound.
    pub fn with_service(mut self, service: TelemetryService) -> Self {
        self.service = service;
        self
    }

    /// Handle for stopping this server from another task.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Serve until shutdown is requested and all in-flight calls finished.
    ///
    /// Returns an error only for unrecoverable transport failures.
    pub async fn serve(self) -> Result<()> {
        let Self {
            listener,
            local_addr,
            security,
            service,
            shutdown,
        } = self;

        let result = run(listener, security, service, shutdown.clone()).await;

        // Also stops the accept task when tonic bailed out on its own.
        shutdown.shutdown();
        shutdown.mark_terminated();

        match &result {
            Ok(()) => info!(%local_addr, "server stopped"),
            Err(e) => warn!(%local_addr, error = %e, "server stopped with error"),
        }
        result
    }
}

async fn run(
    listener: TcpListener,
    security: TransportSecurity,
    service: TelemetryService,
    shutdown: ShutdownHandle,
) -> Result<()> {
    let mut builder = Server::builder();
    if let Some(tls) = security.server_tls_config() {
        builder = builder
            .tls_config(tls)
            .map_err(|e| TelemetryError::Serve(format!("invalid TLS configuration: {e}")))?;
    }

    let incoming = accept_until_shutdown(listener, shutdown.clone());
    let signal = {
        let shutdown = shutdown.clone();
        async move { shutdown.requested().await }
    };

    builder
        .add_service(TelemetryGrpcServer::new(service))
        .serve_with_incoming_shutdown(incoming, signal)
        .await
        .map_err(|e| TelemetryError::Serve(e.to_string()))
}

/// Forward accepted connections until shutdown, then close the listener.
fn accept_until_shutdown(
    listener: TcpListener,
    shutdown: ShutdownHandle,
) -> ReceiverStream<std::io::Result<TcpStream>> {
    let (tx, rx) = mpsc::channel(ACCEPT_QUEUE);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.requested() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "connection accepted");
                        if tx.send(Ok(stream)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
            }
        }
        drop(listener);
        debug!("listener closed");
    });

    ReceiverStream::new(rx)
}
