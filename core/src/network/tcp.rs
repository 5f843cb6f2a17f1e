//! TCP handshakes, the one socket primitive every reachability based probe uses.

use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use netlens_common::error::ProbeError;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Completes a TCP handshake with `addr` within `limit` and returns how long it took.
///
/// The stream is dropped right away; only the handshake is measured.
pub async fn handshake(addr: SocketAddr, limit: Duration) -> Result<Duration, ProbeError> {
    let started = Instant::now();

    match timeout(limit, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => Ok(started.elapsed()),
        Ok(Err(e)) if e.kind() == io::ErrorKind::TimedOut => {
            Err(ProbeError::Timeout { after: limit })
        }
        Ok(Err(e)) => Err(ProbeError::from_io(e, addr)),
        Err(_elapsed) => Err(ProbeError::Timeout { after: limit }),
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
