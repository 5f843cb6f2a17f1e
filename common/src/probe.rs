//! # Probe data model
//!
//! * [`request`]: what the caller asks for. Immutable once submitted.
//! * [`event`]: one observation made while a run is in flight.
//! * [`result`]: the terminal record that closes a run.
//! * [`stats`]: aggregates derived from successful events only.

pub mod event;
pub mod request;
pub mod result;
pub mod stats;

use std::fmt;

/// Identifies one probe execution inside an engine. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunHandle(u64);

impl RunHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RunHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    Ping,
    Dns,
    PortScan,
    Traceroute,
    Throughput,
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProbeKind::Ping => "ping",
            ProbeKind::Dns => "dns",
            ProbeKind::PortScan => "port scan",
            ProbeKind::Traceroute => "traceroute",
            ProbeKind::Throughput => "throughput",
        };
        f.write_str(name)
    }
}
