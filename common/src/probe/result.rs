//! # Run results
//!
//! A probe reports a [`ProbeOutcome`] (status plus a kind-specific [`Summary`]);
//! the engine wraps it together with the recorded events into the terminal
//! [`RunResult`].

use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use crate::error::EventError;

use super::event::ProbeEvent;
use super::request::DnsMode;
use super::stats::{AggregateStatistics, QualityRating};
use super::{ProbeKind, RunHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStatus {
    Completed,
    PartiallyCompleted,
    Failed,
    Cancelled,
}

impl RunStatus {
    /// Status of a run made of `attempted` independent steps, `succeeded` of which
    /// went through.
    pub fn from_steps(succeeded: usize, attempted: usize) -> Self {
        if attempted == 0 || succeeded == 0 {
            RunStatus::Failed
        } else if succeeded < attempted {
            RunStatus::PartiallyCompleted
        } else {
            RunStatus::Completed
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunStatus::Completed => "Completed",
            RunStatus::PartiallyCompleted => "PartiallyCompleted",
            RunStatus::Failed => "Failed",
            RunStatus::Cancelled => "Cancelled",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenPort {
    pub port: u16,
    pub service: Option<&'static str>,
}

impl fmt::Display for OpenPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.service {
            Some(name) => write!(f, "{} ({name})", self.port),
            None => write!(f, "{}", self.port),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Summary {
    Ping {
        attempts: u32,
        successes: u32,
        quality: Option<QualityRating>,
    },
    Dns {
        mode: DnsMode,
        addresses: Vec<IpAddr>,
        canonical_name: Option<String>,
    },
    PortScan {
        scanned: usize,
        open: Vec<OpenPort>,
        closed: usize,
    },
    Traceroute {
        hops: u32,
        reached: bool,
        /// Always true: hops are reachability checks, not TTL-limited probes.
        approximated: bool,
    },
    Throughput {
        latency: Option<Duration>,
        download_mbps: Option<f64>,
        upload_mbps: Option<f64>,
    },
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Summary::Ping {
                attempts,
                successes,
                quality,
            } => {
                write!(f, "{successes}/{attempts} successful")?;
                if let Some(quality) = quality {
                    write!(f, ", quality {quality}")?;
                }
                Ok(())
            }
            Summary::Dns {
                mode: DnsMode::Forward,
                addresses,
                canonical_name,
            } => {
                write!(f, "{} address(es)", addresses.len())?;
                if let Some(name) = canonical_name {
                    write!(f, ", canonical name {name}")?;
                }
                Ok(())
            }
            Summary::Dns {
                mode: DnsMode::Reverse,
                canonical_name,
                ..
            } => match canonical_name {
                Some(name) => write!(f, "reverse lookup: {name}"),
                None => f.write_str("reverse lookup: no name"),
            },
            Summary::PortScan { scanned, open, .. } => {
                write!(f, "{}/{scanned} open", open.len())?;
                if !open.is_empty() {
                    let list: Vec<String> = open.iter().map(OpenPort::to_string).collect();
                    write!(f, ": {}", list.join(", "))?;
                }
                Ok(())
            }
            Summary::Traceroute {
                hops,
                reached,
                approximated,
            } => {
                let outcome = if *reached { "reached" } else { "not reached" };
                write!(f, "destination {outcome} after {hops} hop(s)")?;
                if *approximated {
                    f.write_str(" (approximated)")?;
                }
                Ok(())
            }
            Summary::Throughput {
                latency,
                download_mbps,
                upload_mbps,
            } => {
                let mut parts = Vec::new();
                if let Some(latency) = latency {
                    parts.push(format!("latency {} ms", latency.as_millis()));
                }
                if let Some(rate) = download_mbps {
                    parts.push(format!("download {rate:.2} Mbps"));
                }
                if let Some(rate) = upload_mbps {
                    parts.push(format!("upload {rate:.2} Mbps"));
                }
                if parts.is_empty() {
                    f.write_str("no stage succeeded")
                } else {
                    f.write_str(&parts.join(", "))
                }
            }
        }
    }
}

/// What a probe hands back when it runs to its natural end.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub status: RunStatus,
    pub summary: Summary,
}

impl ProbeOutcome {
    pub fn new(status: RunStatus, summary: Summary) -> Self {
        Self { status, summary }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub run: RunHandle,
    pub kind: ProbeKind,
    pub target: String,
    pub status: RunStatus,
    pub statistics: AggregateStatistics,
    /// Absent when the run was cancelled or failed before the probe could summarize.
    pub summary: Option<Summary>,
    pub events: Vec<ProbeEvent>,
    pub elapsed: Duration,
    pub error: Option<EventError>,
}

impl RunResult {
    pub fn quality(&self) -> Option<QualityRating> {
        self.statistics.quality()
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}: {}", self.run, self.kind, self.target, self.status)?;
        if let Some(summary) = &self.summary {
            write!(f, ", {summary}")?;
        }
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
