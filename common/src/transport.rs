//! The network primitives every probe is built from.
//!
//! Probes depend on these traits only, never on sockets or resolvers directly.
//! `netlens-core` ships the real implementations; tests plug in deterministic
//! stubs.
//!
//! **Contract:** every call is bounded by the timeout it is given and reports a
//! [`ProbeError`] instead of panicking.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProbeError;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Forward lookup. An empty answer is a [`ProbeError::Resolution`].
    async fn resolve(&self, host: &str, timeout: Duration) -> Result<Vec<IpAddr>, ProbeError>;

    /// PTR lookup, returning the name without its trailing dot.
    async fn reverse(&self, addr: IpAddr, timeout: Duration) -> Result<String, ProbeError>;

    /// Full TCP handshake. Returns the time the handshake took.
    async fn connect(&self, addr: SocketAddr, timeout: Duration) -> Result<Duration, ProbeError>;

    /// Whether the host answers at all. A refused connection still counts as an
    /// answer, so only timeouts and unreachable routes fail.
    async fn reach(&self, addr: SocketAddr, timeout: Duration) -> Result<Duration, ProbeError> {
        let started = std::time::Instant::now();
        match self.connect(addr, timeout).await {
            Ok(elapsed) => Ok(elapsed),
            Err(ProbeError::ConnectionRefused { .. }) => Ok(started.elapsed()),
            Err(err) => Err(err),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    /// Body size in bytes, counted as it streamed in.
    pub bytes: u64,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpReply, ProbeError>;

    async fn post(&self, url: &str, body: Vec<u8>, timeout: Duration)
    -> Result<HttpReply, ProbeError>;

    /// Fetches a small text body, used for public IP lookups.
    async fn get_text(&self, url: &str, timeout: Duration) -> Result<String, ProbeError>;
}
