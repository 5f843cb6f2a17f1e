//! # Probe events
//!
//! A run produces a finite sequence of [`ProbeEvent`]s. The engine stamps each one
//! with the run handle and a sequence number that starts at 1 and grows by exactly
//! one; probes only describe *what* they observed through [`Observation`].

use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use crate::error::EventError;
use crate::network::address::{AddressClass, IpFamily};

use super::RunHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventStatus {
    Success,
    Failure,
    Timeout,
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventStatus::Success => f.write_str("Success"),
            EventStatus::Failure => f.write_str("Failure"),
            EventStatus::Timeout => f.write_str("Timeout"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    Open,
    Closed,
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortState::Open => f.write_str("open"),
            PortState::Closed => f.write_str("closed"),
        }
    }
}

/// Throughput stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Latency,
    Download,
    Upload,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Latency => f.write_str("latency"),
            Stage::Download => f.write_str("download"),
            Stage::Upload => f.write_str("upload"),
        }
    }
}

/// The kind-specific payload of an event.
///
/// Latency fields are `None` whenever the underlying step did not succeed.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    PingAttempt {
        attempt: u32,
        latency: Option<Duration>,
    },
    Address {
        addr: IpAddr,
        family: IpFamily,
    },
    Reachability {
        addr: IpAddr,
        latency: Option<Duration>,
    },
    Hostname {
        addr: IpAddr,
        hostname: String,
        canonical: String,
        class: AddressClass,
    },
    Port {
        port: u16,
        service: Option<&'static str>,
        state: PortState,
        latency: Option<Duration>,
    },
    Hop {
        hop: u32,
        latency: Option<Duration>,
        reached: bool,
    },
    Latency {
        latency: Option<Duration>,
    },
    Sample {
        url: String,
        bytes: u64,
        elapsed: Duration,
    },
    Throughput {
        stage: Stage,
        bytes: u64,
        elapsed: Duration,
        mbps: f64,
    },
    /// Whatever escaped a probe, recorded by the engine as the run's last event.
    Fault {
        message: String,
    },
}

impl Observation {
    /// The round-trip sample this observation contributes to run statistics.
    pub fn latency(&self) -> Option<Duration> {
        match self {
            Observation::PingAttempt { latency, .. }
            | Observation::Reachability { latency, .. }
            | Observation::Port { latency, .. }
            | Observation::Hop { latency, .. }
            | Observation::Latency { latency } => *latency,
            _ => None,
        }
    }
}

fn fmt_latency(latency: &Option<Duration>) -> String {
    match latency {
        Some(d) => format!("{:.1} ms", d.as_secs_f64() * 1000.0),
        None => "-".to_string(),
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observation::PingAttempt { attempt, latency } => {
                write!(f, "attempt {attempt}: {}", fmt_latency(latency))
            }
            Observation::Address { addr, family } => write!(f, "{family} address {addr}"),
            Observation::Reachability { addr, latency } => {
                write!(f, "reachability of {addr}: {}", fmt_latency(latency))
            }
            Observation::Hostname {
                addr,
                hostname,
                canonical,
                class,
            } => write!(f, "{addr} is {hostname} (canonical {canonical}, {class})"),
            Observation::Port {
                port,
                service,
                state,
                ..
            } => match service {
                Some(name) => write!(f, "port {port} ({name}) {state}"),
                None => write!(f, "port {port} {state}"),
            },
            Observation::Hop {
                hop,
                latency,
                reached,
            } => {
                write!(f, "hop {hop}: {}", fmt_latency(latency))?;
                if *reached {
                    f.write_str(" (destination reached)")?;
                }
                Ok(())
            }
            Observation::Latency { latency } => write!(f, "latency {}", fmt_latency(latency)),
            Observation::Sample {
                url,
                bytes,
                elapsed,
            } => write!(f, "{bytes} bytes from {url} in {} ms", elapsed.as_millis()),
            Observation::Throughput { stage, mbps, .. } => write!(f, "{stage} {mbps:.2} Mbps"),
            Observation::Fault { message } => write!(f, "fault: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeEvent {
    pub run: RunHandle,
    pub seq: u64,
    pub target: String,
    pub step: u32,
    pub status: EventStatus,
    pub observation: Observation,
    pub error: Option<EventError>,
}

impl ProbeEvent {
    pub fn is_success(&self) -> bool {
        self.status == EventStatus::Success
    }

    pub fn latency(&self) -> Option<Duration> {
        self.observation.latency()
    }
}

impl fmt::Display for ProbeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} #{} {} step {} {}: {}",
            self.run, self.seq, self.target, self.step, self.status, self.observation
        )?;
        if let Some(err) = &self.error {
            write!(f, " ({err})")?;
        }
        Ok(())
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
