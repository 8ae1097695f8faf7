//! telemetryd: particle telemetry ingestion daemon.
//!
//! Accepts `CastParticleState` streams over gRPC, answers each with a count
//! and appends the result to the telemetry database.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{ArgAction, Parser};
use tracing::{error, info};

use telemetry_server::netaddr;
use telemetry_server::server::config::{ConfigOverrides, ServerConfig};
use telemetry_server::server::shutdown::ctrl_c_interrupts;
use telemetry_server::server::{ShutdownCoordinator, TelemetryServer, TelemetryService};
use telemetry_server::store::FileStore;

/// telemetryd: particle telemetry ingestion daemon.
#[derive(Parser)]
#[command(name = "telemetryd")]
#[command(version = telemetry_server::PKG_VERSION)]
#[command(about = "Particle telemetry ingestion daemon")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Connection uses TLS if true, else plain TCP. `--tls` alone means true.
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    tls: Option<bool>,

    /// The TLS cert file.
    #[arg(long = "cert_file")]
    cert_file: Option<PathBuf>,

    /// The TLS key file.
    #[arg(long = "key_file")]
    key_file: Option<PathBuf>,

    /// The server port.
    #[arg(long, env = "TELEMETRY_PORT")]
    port: Option<u16>,

    /// Path to telemetry database.
    #[arg(long, env = "TELEMETRY_DATABASE")]
    database: Option<PathBuf>,
}

impl Args {
    fn resolve(self) -> telemetry_server::Result<ServerConfig> {
        let base = match self.config.as_deref() {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        Ok(base.with_overrides(ConfigOverrides {
            tls: self.tls,
            cert_file: self.cert_file,
            key_file: self.key_file,
            port: self.port,
            database: self.database,
        }))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "telemetryd terminated");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> telemetry_server::Result<()> {
    let config = args.resolve()?;

    // Bind first: a credential or port failure must not create the database.
    let server = TelemetryServer::bind(&config, TelemetryService::without_store()).await?;

    let store = FileStore::open(&config.database).await?;
    info!(database = ?store.path(), "opened telemetry database");
    let server = server.with_service(TelemetryService::new(Arc::new(store)));

    let coordinator = ShutdownCoordinator::spawn(server.shutdown_handle(), ctrl_c_interrupts());

    let outbound = netaddr::outbound_ip().await;
    info!(
        version = telemetry_server::version_string(),
        %outbound,
        port = server.local_addr().port(),
        tls = server.is_tls(),
        "starting telemetry server"
    );

    server.serve().await?;
    coordinator.wait().await;

    info!("shutdown complete");
    Ok(())
}
