//! Name resolution backed by the system's resolver configuration.

use std::net::IpAddr;
use std::time::Duration;

use netlens_common::error::ProbeError;
use tokio::time::timeout;
use tracing::{debug, warn};
use trust_dns_resolver::TokioAsyncResolver;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};

#[derive(Clone)]
pub struct DnsResolver {
    inner: TokioAsyncResolver,
}

impl DnsResolver {
    /// Reads `/etc/resolv.conf` (or the platform equivalent). Falls back to the
    /// resolver crate's public defaults when the system config is unusable.
    pub fn from_system() -> Self {
        let inner = match TokioAsyncResolver::tokio_from_system_conf() {
            Ok(resolver) => resolver,
            Err(e) => {
                warn!("System resolver config unavailable ({e}), using public defaults");
                TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
            }
        };
        Self { inner }
    }

    pub async fn lookup(&self, host: &str, limit: Duration) -> Result<Vec<IpAddr>, ProbeError> {
        if let Ok(addr) = host.parse::<IpAddr>() {
            return Ok(vec![addr]);
        }

        let lookup = match timeout(limit, self.inner.lookup_ip(host)).await {
            Ok(Ok(lookup)) => lookup,
            Ok(Err(e)) => return Err(ProbeError::resolution(host, e)),
            Err(_elapsed) => {
                return Err(ProbeError::resolution(
                    host,
                    format!("no answer within {} ms", limit.as_millis()),
                ));
            }
        };

        let addrs: Vec<IpAddr> = lookup.iter().collect();
        debug!("{host} resolved to {} address(es)", addrs.len());
        if addrs.is_empty() {
            return Err(ProbeError::resolution(host, "no addresses found"));
        }
        Ok(addrs)
    }

    pub async fn reverse(&self, addr: IpAddr, limit: Duration) -> Result<String, ProbeError> {
        let host = addr.to_string();
        let lookup = match timeout(limit, self.inner.reverse_lookup(addr)).await {
            Ok(Ok(lookup)) => lookup,
            Ok(Err(e)) => return Err(ProbeError::resolution(&host, e)),
            Err(_elapsed) => {
                return Err(ProbeError::resolution(
                    &host,
                    format!("no PTR answer within {} ms", limit.as_millis()),
                ));
            }
        };

        lookup
            .iter()
            .map(|name| name.to_string().trim_end_matches('.').to_string())
            .find(|name| !name.is_empty())
            .ok_or_else(|| ProbeError::resolution(&host, "no PTR record"))
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
