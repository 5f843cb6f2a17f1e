//! # Local network information
//!
//! Backs `netlens info`:
//! * **Interfaces**: every up, non-loopback interface that carries an address,
//!   wired interfaces first.
//! * **Local address**: the source address the OS would route external traffic from.
//! * **Public address**: asked from a list of HTTP echo services, first answer wins.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::time::Duration;

use netlens_common::network::address::parse_ip_reply;
use netlens_common::transport::HttpClient;
use pnet::datalink::{self, NetworkInterface};
use pnet::ipnetwork::IpNetwork;
use pnet::util::MacAddr;
use tracing::debug;

#[cfg(target_os = "linux")]
use linux_impl::{is_physical, is_wireless};
#[cfg(target_os = "macos")]
use macos_impl::{is_physical, is_wireless};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SkipReason {
    IsDown,
    IsLoopback,
    NoAddress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InterfaceKind {
    Wired,
    Wireless,
    Virtual,
}

#[derive(Debug, Clone)]
pub struct InterfaceSummary {
    pub name: String,
    pub kind: InterfaceKind,
    pub mac: Option<MacAddr>,
    pub ips: Vec<IpNetwork>,
}

fn is_listable(interface: &NetworkInterface) -> Result<(), SkipReason> {
    if !interface.is_up() {
        return Err(SkipReason::IsDown);
    }
    if interface.is_loopback() {
        return Err(SkipReason::IsLoopback);
    }
    if interface.ips.is_empty() {
        return Err(SkipReason::NoAddress);
    }
    Ok(())
}

fn classify(
    interface: &NetworkInterface,
    is_physical: impl Fn(&NetworkInterface) -> bool,
    is_wireless: impl Fn(&NetworkInterface) -> bool,
) -> InterfaceKind {
    if !is_physical(interface) {
        InterfaceKind::Virtual
    } else if is_wireless(interface) {
        InterfaceKind::Wireless
    } else {
        InterfaceKind::Wired
    }
}

fn summarize(
    interfaces: Vec<NetworkInterface>,
    is_physical: impl Fn(&NetworkInterface) -> bool,
    is_wireless: impl Fn(&NetworkInterface) -> bool,
) -> Vec<InterfaceSummary> {
    let mut summaries: Vec<InterfaceSummary> = interfaces
        .into_iter()
        .filter(|interface| match is_listable(interface) {
            Ok(()) => true,
            Err(reason) => {
                debug!("Skipping interface {}: {reason:?}", interface.name);
                false
            }
        })
        .map(|interface| InterfaceSummary {
            kind: classify(&interface, &is_physical, &is_wireless),
            name: interface.name,
            mac: interface.mac,
            ips: interface.ips,
        })
        .collect();

    summaries.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.name.cmp(&b.name)));
    summaries
}

pub fn list_interfaces() -> Vec<InterfaceSummary> {
    summarize(datalink::interfaces(), is_physical, is_wireless)
}

/// The local address used to reach `target`. No packet is sent: connecting a
/// UDP socket only asks the kernel for a route.
pub fn route_source_ip(target: IpAddr) -> Option<IpAddr> {
    let bind_addr: IpAddr = match target {
        IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        IpAddr::V6(_) => IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED),
    };
    let socket = UdpSocket::bind((bind_addr, 0)).ok()?;
    socket.connect((target, 53)).ok()?;
    socket.local_addr().ok().map(|addr| addr.ip())
}

pub fn local_ip() -> Option<IpAddr> {
    route_source_ip(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicIp {
    pub addr: IpAddr,
    pub service: String,
}

/// Asks each service in turn and returns the first address found.
pub async fn public_ip(
    http: &dyn HttpClient,
    services: &[String],
    timeout: Duration,
) -> Option<PublicIp> {
    for service in services {
        match http.get_text(service, timeout).await {
            Ok(body) => match parse_ip_reply(&body) {
                Some(addr) => {
                    return Some(PublicIp {
                        addr,
                        service: service.clone(),
                    });
                }
                None => debug!("{service} answered without an address"),
            },
            Err(e) => debug!("{service} failed: {e}"),
        }
    }
    None
}

#[cfg(target_os = "linux")]
mod linux_impl {
    use super::*;
    use std::path::Path;

    pub fn is_physical(interface: &NetworkInterface) -> bool {
        Path::new(&format!("/sys/class/net/{}/device", interface.name)).exists()
    }

    pub fn is_wireless(interface: &NetworkInterface) -> bool {
        Path::new(&format!("/sys/class/net/{}/wireless", interface.name)).exists()
    }
}

#[cfg(target_os = "macos")]
mod macos_impl {
    use super::*;
    use std::collections::HashSet;
    use std::process::Command;
    use std::sync::OnceLock;

    struct HardwareInfo {
        physical_devices: HashSet<String>,
        wireless_devices: HashSet<String>,
    }

    /// Shells out to `networksetup` once, on first access.
    fn hardware_info() -> &'static HardwareInfo {
        static HARDWARE_INFO: OnceLock<HardwareInfo> = OnceLock::new();

        HARDWARE_INFO.get_or_init(|| {
            let mut physical = HashSet::new();
            let mut wireless = HashSet::new();

            if let Ok(output) = Command::new("networksetup").arg("-listallhardwareports").output() {
                let stdout = String::from_utf8_lossy(&output.stdout);
                for line in stdout.lines() {
                    if let Some(device) = line.strip_prefix("Device: ") {
                        physical.insert(device.trim().to_string());
                    }
                }
            }

            for device in &physical {
                let is_wifi = Command::new("networksetup")
                    .arg("-getairportnetwork")
                    .arg(device)
                    .output()
                    .map(|out| out.status.success())
                    .unwrap_or(false);
                if is_wifi {
                    wireless.insert(device.clone());
                }
            }

            HardwareInfo {
                physical_devices: physical,
                wireless_devices: wireless,
            }
        })
    }

    pub fn is_physical(interface: &NetworkInterface) -> bool {
        hardware_info().physical_devices.contains(&interface.name)
    }

    pub fn is_wireless(interface: &NetworkInterface) -> bool {
        hardware_info().wireless_devices.contains(&interface.name)
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn is_physical(interface: &NetworkInterface) -> bool {
    interface.mac.is_some()
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn is_wireless(_interface: &NetworkInterface) -> bool {
    false
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
