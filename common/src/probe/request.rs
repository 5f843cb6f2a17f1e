//! # Probe requests
//!
//! A [`ProbeRequest`] names a target and carries the parameters of exactly one
//! probe. Its fields are private: once built it can only be read, and the engine
//! shares it behind an `Arc` for the lifetime of the run.
//!
//! Every parameter block implements `Default` with the behavior-compatible
//! defaults; [`crate::config::Config`] can override them from a file.

use std::time::Duration;

use crate::network::ports::PortSelection;

use super::ProbeKind;

/// TCP port used by reachability checks when nothing else is configured.
pub const REACH_PORT: u16 = 80;

/// Single-host mode probes one explicit target; batch mode is the quick pass
/// over the default host list and uses shorter bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Single,
    Batch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PingParams {
    pub attempts: u32,
    pub timeout: Duration,
    /// Pause between two attempts.
    pub interval: Duration,
    pub port: u16,
}

impl PingParams {
    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::Single => Self::default(),
            Mode::Batch => Self {
                timeout: Duration::from_secs(3),
                interval: Duration::from_millis(500),
                ..Self::default()
            },
        }
    }
}

impl Default for PingParams {
    fn default() -> Self {
        Self {
            attempts: 5,
            timeout: Duration::from_secs(5),
            interval: Duration::from_secs(1),
            port: REACH_PORT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DnsMode {
    #[default]
    Forward,
    Reverse,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DnsParams {
    pub mode: DnsMode,
    pub resolve_timeout: Duration,
    /// Bound of the reachability sub-check run against each resolved address.
    pub reach_timeout: Duration,
    pub port: u16,
}

impl DnsParams {
    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::Single => Self::default(),
            Mode::Batch => Self {
                reach_timeout: Duration::from_secs(2),
                ..Self::default()
            },
        }
    }

    pub fn reverse(mut self) -> Self {
        self.mode = DnsMode::Reverse;
        self
    }
}

impl Default for DnsParams {
    fn default() -> Self {
        Self {
            mode: DnsMode::Forward,
            resolve_timeout: Duration::from_secs(5),
            reach_timeout: Duration::from_secs(3),
            port: REACH_PORT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortScanParams {
    pub ports: PortSelection,
    pub timeout: Duration,
    /// Rate limit between two connect attempts. Zero disables it.
    pub delay: Duration,
}

impl Default for PortScanParams {
    fn default() -> Self {
        Self {
            ports: PortSelection::Common,
            timeout: Duration::from_secs(2),
            delay: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TracerouteParams {
    pub max_hops: u32,
    /// First hop at which a successful check counts as "destination reached".
    pub reach_threshold: u32,
    pub hop_timeout: Duration,
    pub delay: Duration,
    pub port: u16,
}

impl TracerouteParams {
    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::Single => Self::default(),
            Mode::Batch => Self {
                max_hops: 5,
                reach_threshold: 3,
                hop_timeout: Duration::from_secs(1),
                delay: Duration::from_millis(200),
                port: REACH_PORT,
            },
        }
    }
}

impl Default for TracerouteParams {
    fn default() -> Self {
        Self {
            max_hops: 30,
            reach_threshold: 5,
            hop_timeout: Duration::from_secs(2),
            delay: Duration::from_millis(500),
            port: REACH_PORT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Both,
    Download,
    Upload,
}

impl Direction {
    pub fn includes_download(&self) -> bool {
        matches!(self, Direction::Both | Direction::Download)
    }

    pub fn includes_upload(&self) -> bool {
        matches!(self, Direction::Both | Direction::Upload)
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "both" => Ok(Direction::Both),
            "download" | "down" => Ok(Direction::Download),
            "upload" | "up" => Ok(Direction::Upload),
            other => Err(format!("unknown direction: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThroughputParams {
    pub direction: Direction,
    pub latency_url: String,
    pub download_urls: Vec<String>,
    pub upload_url: String,
    pub upload_bytes: usize,
    pub latency_timeout: Duration,
    pub transfer_timeout: Duration,
}

impl Default for ThroughputParams {
    fn default() -> Self {
        Self {
            direction: Direction::Both,
            latency_url: "https://httpbin.org/get".to_string(),
            download_urls: vec![
                "https://httpbin.org/bytes/1024".to_string(),
                "https://httpbin.org/bytes/2048".to_string(),
                "https://httpbin.org/bytes/4096".to_string(),
            ],
            upload_url: "https://httpbin.org/post".to_string(),
            upload_bytes: 1024 * 1024,
            latency_timeout: Duration::from_secs(5),
            transfer_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProbeParams {
    Ping(PingParams),
    Dns(DnsParams),
    PortScan(PortScanParams),
    Traceroute(TracerouteParams),
    Throughput(ThroughputParams),
}

impl ProbeParams {
    pub fn kind(&self) -> ProbeKind {
        match self {
            ProbeParams::Ping(_) => ProbeKind::Ping,
            ProbeParams::Dns(_) => ProbeKind::Dns,
            ProbeParams::PortScan(_) => ProbeKind::PortScan,
            ProbeParams::Traceroute(_) => ProbeKind::Traceroute,
            ProbeParams::Throughput(_) => ProbeKind::Throughput,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeRequest {
    target: String,
    params: ProbeParams,
}

impl ProbeRequest {
    pub fn new(target: impl Into<String>, params: ProbeParams) -> Self {
        Self {
            target: target.into().trim().to_string(),
            params,
        }
    }

    pub fn ping(target: impl Into<String>, params: PingParams) -> Self {
        Self::new(target, ProbeParams::Ping(params))
    }

    pub fn dns(target: impl Into<String>, params: DnsParams) -> Self {
        Self::new(target, ProbeParams::Dns(params))
    }

    pub fn port_scan(target: impl Into<String>, params: PortScanParams) -> Self {
        Self::new(target, ProbeParams::PortScan(params))
    }

    pub fn traceroute(target: impl Into<String>, params: TracerouteParams) -> Self {
        Self::new(target, ProbeParams::Traceroute(params))
    }

    /// Throughput runs against the configured endpoints; the target is only a label.
    pub fn throughput(params: ThroughputParams) -> Self {
        let target = params
            .latency_url
            .split("://")
            .nth(1)
            .and_then(|rest| rest.split('/').next())
            .unwrap_or("throughput")
            .to_string();
        Self::new(target, ProbeParams::Throughput(params))
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn kind(&self) -> ProbeKind {
        self.params.kind()
    }

    pub fn params(&self) -> &ProbeParams {
        &self.params
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
