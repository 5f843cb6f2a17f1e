//! The production [`Transport`]: tokio sockets plus the system resolver.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use netlens_common::error::ProbeError;
use netlens_common::transport::Transport;

use super::resolver::DnsResolver;
use super::tcp;

#[derive(Clone)]
pub struct SystemTransport {
    resolver: DnsResolver,
}

impl SystemTransport {
    pub fn new() -> Self {
        Self {
            resolver: DnsResolver::from_system(),
        }
    }
}

impl Default for SystemTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for SystemTransport {
    async fn resolve(&self, host: &str, timeout: Duration) -> Result<Vec<IpAddr>, ProbeError> {
        self.resolver.lookup(host, timeout).await
    }

    async fn reverse(&self, addr: IpAddr, timeout: Duration) -> Result<String, ProbeError> {
        self.resolver.reverse(addr, timeout).await
    }

    async fn connect(&self, addr: SocketAddr, timeout: Duration) -> Result<Duration, ProbeError> {
        tcp::handshake(addr, timeout).await
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
