//! Outbound address discovery for the startup log line.

use std::net::{IpAddr, Ipv4Addr};

use tokio::net::UdpSocket;
use tracing::warn;

/// Public address used only to pick a route. Connecting a UDP socket sends
/// no packets.
const PROBE_TARGET: &str = "8.8.8.8:80";

/// The local address this host would use to reach the internet.
///
/// Falls back to `127.0.0.1` when no route exists. Informational only.
pub async fn outbound_ip() -> IpAddr {
    match route_source(PROBE_TARGET).await {
        Ok(ip) => ip,
        Err(e) => {
            warn!(error = %e, "could not determine outbound address");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

async fn route_source(target: &str) -> std::io::Result<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
    socket.connect(target).await?;
    Ok(socket.local_addr()?.ip())
}
