//! Deterministic transports for driving the engine without a network.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use netlens_common::error::ProbeError;
use netlens_common::transport::{HttpClient, HttpReply, Transport};
use netlens_core::Engine;

#[derive(Default)]
pub struct ScriptedTransport {
    pub hosts: HashMap<String, Vec<IpAddr>>,
    /// Handshake time per open port. Other ports refuse.
    pub open_ports: HashMap<u16, Duration>,
    /// Every connect times out instead of being refused.
    pub unreachable: bool,
    /// Wall time each connect takes before answering.
    pub step_delay: Duration,
}

impl ScriptedTransport {
    pub fn host(mut self, name: &str, addrs: &[&str]) -> Self {
        let addrs = addrs.iter().map(|a| a.parse().unwrap()).collect();
        self.hosts.insert(name.to_string(), addrs);
        self
    }

    pub fn open(mut self, port: u16, handshake: Duration) -> Self {
        self.open_ports.insert(port, handshake);
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn slow(mut self, step_delay: Duration) -> Self {
        self.step_delay = step_delay;
        self
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn resolve(&self, host: &str, _timeout: Duration) -> Result<Vec<IpAddr>, ProbeError> {
        if let Ok(addr) = host.parse::<IpAddr>() {
            return Ok(vec![addr]);
        }
        self.hosts
            .get(host)
            .cloned()
            .ok_or_else(|| ProbeError::resolution(host, "NXDOMAIN"))
    }

    async fn reverse(&self, addr: IpAddr, _timeout: Duration) -> Result<String, ProbeError> {
        Err(ProbeError::resolution(&addr.to_string(), "no PTR record"))
    }

    async fn connect(&self, addr: SocketAddr, timeout: Duration) -> Result<Duration, ProbeError> {
        if !self.step_delay.is_zero() {
            tokio::time::sleep(self.step_delay).await;
        }
        if self.unreachable {
            return Err(ProbeError::Timeout { after: timeout });
        }
        match self.open_ports.get(&addr.port()) {
            Some(handshake) => Ok(*handshake),
            None => Err(ProbeError::ConnectionRefused { addr }),
        }
    }
}

/// An HTTP client with no network behind it.
pub struct Offline;

#[async_trait]
impl HttpClient for Offline {
    async fn get(&self, _url: &str, _timeout: Duration) -> Result<HttpReply, ProbeError> {
        Err(ProbeError::Io("offline".to_string()))
    }

    async fn post(
        &self,
        _url: &str,
        _body: Vec<u8>,
        _timeout: Duration,
    ) -> Result<HttpReply, ProbeError> {
        Err(ProbeError::Io("offline".to_string()))
    }

    async fn get_text(&self, _url: &str, _timeout: Duration) -> Result<String, ProbeError> {
        Err(ProbeError::Io("offline".to_string()))
    }
}

pub fn engine(workers: usize, transport: ScriptedTransport) -> Engine {
    Engine::with_workers(workers, Arc::new(transport), Arc::new(Offline))
}
