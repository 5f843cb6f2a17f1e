//! # Configuration
//!
//! Everything a run can be tuned with, loaded from an optional YAML file. Every
//! field has a default, so a partial file (or no file at all) is valid:
//!
//! ```yaml
//! workers: 8
//! ping:
//!   attempts: 3
//! scan:
//!   delay_ms: 0
//! ```
//!
//! The file is taken from `--config` first, then from the `NETLENS_CONFIG`
//! environment variable.

use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::network::ports::PortSelection;
use crate::probe::request::{
    Direction, DnsParams, Mode, PingParams, PortScanParams, ThroughputParams, TracerouteParams,
};

pub const CONFIG_ENV: &str = "NETLENS_CONFIG";

const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_RETAINED_RUNS: usize = 256;

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

fn as_ms(value: Duration) -> u64 {
    value.as_millis() as u64
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Size of the engine's worker pool.
    pub workers: usize,
    /// Finished runs the engine keeps for late `await_result`/`subscribe` calls.
    pub retained_runs: usize,
    pub ping: PingConfig,
    pub dns: DnsConfig,
    pub scan: ScanConfig,
    pub trace: TraceConfig,
    pub throughput: ThroughputConfig,
    pub hosts: HostsConfig,
    /// Queried in order until one answers with an address.
    pub public_ip_services: Vec<String>,
    pub public_ip_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            retained_runs: DEFAULT_RETAINED_RUNS,
            ping: PingConfig::default(),
            dns: DnsConfig::default(),
            scan: ScanConfig::default(),
            trace: TraceConfig::default(),
            throughput: ThroughputConfig::default(),
            hosts: HostsConfig::default(),
            public_ip_services: vec![
                "https://api.ipify.org".to_string(),
                "https://httpbin.org/ip".to_string(),
                "https://icanhazip.com".to_string(),
            ],
            public_ip_timeout_ms: 5000,
        }
    }
}

impl Config {
    pub fn public_ip_timeout(&self) -> Duration {
        ms(self.public_ip_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PingConfig {
    pub attempts: u32,
    pub timeout_ms: u64,
    pub interval_ms: u64,
    pub batch_timeout_ms: u64,
    pub batch_interval_ms: u64,
    pub port: u16,
}

impl Default for PingConfig {
    fn default() -> Self {
        let single = PingParams::for_mode(Mode::Single);
        let batch = PingParams::for_mode(Mode::Batch);
        Self {
            attempts: single.attempts,
            timeout_ms: as_ms(single.timeout),
            interval_ms: as_ms(single.interval),
            batch_timeout_ms: as_ms(batch.timeout),
            batch_interval_ms: as_ms(batch.interval),
            port: single.port,
        }
    }
}

impl PingConfig {
    pub fn params(&self, mode: Mode) -> PingParams {
        let (timeout, interval) = match mode {
            Mode::Single => (self.timeout_ms, self.interval_ms),
            Mode::Batch => (self.batch_timeout_ms, self.batch_interval_ms),
        };
        PingParams {
            attempts: self.attempts,
            timeout: ms(timeout),
            interval: ms(interval),
            port: self.port,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DnsConfig {
    pub resolve_timeout_ms: u64,
    pub reach_timeout_ms: u64,
    pub batch_reach_timeout_ms: u64,
    pub port: u16,
}

impl Default for DnsConfig {
    fn default() -> Self {
        let single = DnsParams::for_mode(Mode::Single);
        let batch = DnsParams::for_mode(Mode::Batch);
        Self {
            resolve_timeout_ms: as_ms(single.resolve_timeout),
            reach_timeout_ms: as_ms(single.reach_timeout),
            batch_reach_timeout_ms: as_ms(batch.reach_timeout),
            port: single.port,
        }
    }
}

impl DnsConfig {
    pub fn params(&self, mode: Mode) -> DnsParams {
        let reach = match mode {
            Mode::Single => self.reach_timeout_ms,
            Mode::Batch => self.batch_reach_timeout_ms,
        };
        DnsParams {
            resolve_timeout: ms(self.resolve_timeout_ms),
            reach_timeout: ms(reach),
            port: self.port,
            ..DnsParams::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub timeout_ms: u64,
    pub delay_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        let defaults = PortScanParams::default();
        Self {
            timeout_ms: as_ms(defaults.timeout),
            delay_ms: as_ms(defaults.delay),
        }
    }
}

impl ScanConfig {
    pub fn params(&self, ports: PortSelection) -> PortScanParams {
        PortScanParams {
            ports,
            timeout: ms(self.timeout_ms),
            delay: ms(self.delay_ms),
        }
    }
}

/// The explicit trace and the quick pass are tuned separately.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    pub max_hops: u32,
    pub reach_threshold: u32,
    pub hop_timeout_ms: u64,
    pub delay_ms: u64,
    pub quick_max_hops: u32,
    pub quick_reach_threshold: u32,
    pub quick_hop_timeout_ms: u64,
    pub quick_delay_ms: u64,
    pub port: u16,
}

impl Default for TraceConfig {
    fn default() -> Self {
        let full = TracerouteParams::for_mode(Mode::Single);
        let quick = TracerouteParams::for_mode(Mode::Batch);
        Self {
            max_hops: full.max_hops,
            reach_threshold: full.reach_threshold,
            hop_timeout_ms: as_ms(full.hop_timeout),
            delay_ms: as_ms(full.delay),
            quick_max_hops: quick.max_hops,
            quick_reach_threshold: quick.reach_threshold,
            quick_hop_timeout_ms: as_ms(quick.hop_timeout),
            quick_delay_ms: as_ms(quick.delay),
            port: full.port,
        }
    }
}

impl TraceConfig {
    pub fn params(&self, mode: Mode) -> TracerouteParams {
        let (max_hops, reach_threshold, hop_timeout, delay) = match mode {
            Mode::Single => (
                self.max_hops,
                self.reach_threshold,
                self.hop_timeout_ms,
                self.delay_ms,
            ),
            Mode::Batch => (
                self.quick_max_hops,
                self.quick_reach_threshold,
                self.quick_hop_timeout_ms,
                self.quick_delay_ms,
            ),
        };
        TracerouteParams {
            max_hops,
            reach_threshold,
            hop_timeout: ms(hop_timeout),
            delay: ms(delay),
            port: self.port,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ThroughputConfig {
    pub latency_url: String,
    pub download_urls: Vec<String>,
    pub upload_url: String,
    pub upload_bytes: usize,
    pub latency_timeout_ms: u64,
    pub transfer_timeout_ms: u64,
}

impl Default for ThroughputConfig {
    fn default() -> Self {
        let defaults = ThroughputParams::default();
        Self {
            latency_url: defaults.latency_url,
            download_urls: defaults.download_urls,
            upload_url: defaults.upload_url,
            upload_bytes: defaults.upload_bytes,
            latency_timeout_ms: as_ms(defaults.latency_timeout),
            transfer_timeout_ms: as_ms(defaults.transfer_timeout),
        }
    }
}

impl ThroughputConfig {
    pub fn params(&self, direction: Direction) -> ThroughputParams {
        ThroughputParams {
            direction,
            latency_url: self.latency_url.clone(),
            download_urls: self.download_urls.clone(),
            upload_url: self.upload_url.clone(),
            upload_bytes: self.upload_bytes,
            latency_timeout: ms(self.latency_timeout_ms),
            transfer_timeout: ms(self.transfer_timeout_ms),
        }
    }
}

/// Targets used when a command runs with `--defaults`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HostsConfig {
    pub ping: Vec<String>,
    pub dns: Vec<String>,
    pub scan: Vec<String>,
    pub trace: Vec<String>,
}

impl Default for HostsConfig {
    fn default() -> Self {
        let popular: Vec<String> = ["google.com", "facebook.com", "amazon.com", "netflix.com", "youtube.com"]
            .iter()
            .map(|host| host.to_string())
            .collect();
        let short: Vec<String> = popular.iter().take(3).cloned().collect();

        Self {
            ping: popular.clone(),
            dns: popular,
            scan: short.clone(),
            trace: short,
        }
    }
}

/// Loads the configuration from `path`, falling back to `NETLENS_CONFIG`.
///
/// No path at all, or a path that does not exist, yields the defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let location: Option<PathBuf> = path
        .map(Path::to_path_buf)
        .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from));

    let Some(location) = location else {
        return Ok(Config::default());
    };

    let contents = match std::fs::read_to_string(&location) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!("Config file {} not found, using defaults", location.display());
            return Ok(Config::default());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", location.display()));
        }
    };

    parse_config(&contents).with_context(|| format!("Invalid config in {}", location.display()))
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }

    let config: Config = serde_yaml::from_str(contents)?;
    anyhow::ensure!(config.workers > 0, "workers must be at least 1");
    anyhow::ensure!(config.retained_runs > 0, "retained_runs must be at least 1");
    anyhow::ensure!(config.ping.attempts > 0, "ping.attempts must be at least 1");
    Ok(config)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_request_defaults() {
        let config = Config::default();
        assert_eq!(config.workers, 4);
        assert_eq!(config.retained_runs, 256);
        assert_eq!(config.ping.params(Mode::Single), PingParams::default());
        assert_eq!(config.ping.params(Mode::Batch), PingParams::for_mode(Mode::Batch));
        assert_eq!(config.dns.params(Mode::Batch), DnsParams::for_mode(Mode::Batch));
        assert_eq!(
            config.trace.params(Mode::Batch),
            TracerouteParams::for_mode(Mode::Batch)
        );
        assert_eq!(
            config.scan.params(PortSelection::Common),
            PortScanParams::default()
        );
        assert_eq!(
            config.throughput.params(Direction::Both),
            ThroughputParams::default()
        );
        assert_eq!(config.hosts.ping.len(), 5);
        assert_eq!(config.hosts.scan, vec!["google.com", "facebook.com", "amazon.com"]);
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let yaml = r#"
            workers: 8
            ping:
              attempts: 3
            scan:
              delay_ms: 0
            trace:
              quick_max_hops: 7
        "#;

        let config = parse_config(yaml).unwrap();
        assert_eq!(config.workers, 8);
        assert_eq!(config.ping.attempts, 3);
        assert_eq!(config.ping.timeout_ms, 5000);
        assert_eq!(config.scan.delay_ms, 0);
        assert_eq!(config.scan.timeout_ms, 2000);
        assert_eq!(config.trace.quick_max_hops, 7);
        assert_eq!(config.trace.quick_reach_threshold, 3);
        assert_eq!(config.trace.max_hops, 30);
        assert_eq!(config.public_ip_services.len(), 3);
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(parse_config("  \n").unwrap(), Config::default());
    }

    #[test]
    fn zero_workers_is_rejected() {
        assert!(parse_config("workers: 0").is_err());
        assert!(parse_config("retained_runs: 0").is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = Path::new("/nonexistent/netlens/config.yml");
        assert_eq!(load_config(Some(path)).unwrap(), Config::default());
    }
}
