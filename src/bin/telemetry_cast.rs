//! telemetry-cast: telemetryd CLI client
//!
//! Sends synthetic particle states and probes server health.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use telemetry_server::ParticleState;
use telemetry_server::client::TelemetryClient;
use telemetry_server::server::credentials::DEV_CA_PEM;

/// telemetry-cast: telemetryd CLI client
#[derive(Parser)]
#[command(name = "telemetry-cast")]
#[command(version = telemetry_server::PKG_VERSION)]
#[command(about = "Cast particle states to a telemetry server")]
struct Args {
    /// Server address
    #[arg(
        short,
        long,
        env = "TELEMETRY_ADDRESS",
        default_value = "http://127.0.0.1:10000"
    )]
    address: String,

    /// Connect over TLS
    #[arg(long)]
    tls: bool,

    /// CA certificate to trust (default: bundled development CA)
    #[arg(long = "ca_file")]
    ca_file: Option<PathBuf>,

    /// Name expected in the server certificate
    #[arg(long, default_value = "localhost")]
    domain: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stream synthetic particle states and print the server's tally
    Cast {
        /// Number of states to send
        #[arg(short, long, default_value_t = 100)]
        count: u64,
    },

    /// Check service health
    Health,
}

/// A particle on a slow helix, one state per tick.
fn synthetic_state(tick: u64) -> ParticleState {
    let t = tick as f64 * 0.1;
    ParticleState {
        particle_id: tick % 16,
        x: t.cos(),
        y: t.sin(),
        z: t * 0.05,
        vx: -t.sin(),
        vy: t.cos(),
        vz: 0.05,
        timestamp_ms: (tick * 10) as i64,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let client = if args.tls {
        let ca = match &args.ca_file {
            Some(path) => std::fs::read(path)?,
            None => DEV_CA_PEM.to_vec(),
        };
        TelemetryClient::connect_tls(&args.address, &ca, &args.domain).await?
    } else {
        TelemetryClient::connect(&args.address).await?
    };

    match args.command {
        Command::Cast { count } => {
            let counted = client.cast((0..count).map(synthetic_state)).await?;
            println!("sent {count} states");
            println!("server counted: {counted}");
        }

        Command::Health => {
            let (healthy, version, git_sha) = client.health().await?;
            let status = if healthy { "healthy" } else { "unhealthy" };
            println!(
                "telemetryd {version} ({})",
                git_sha.as_deref().unwrap_or("unknown")
            );
            println!("status: {status}");
        }
    }

    Ok(())
}
