//! # Address classification
//!
//! Helpers that describe an address without touching the network: its family
//! (decided from the literal text, the way the DNS probe reports it), its scope
//! flags, and the IPv6 address type shown by `netlens info`.

use std::fmt;
use std::net::{IpAddr, Ipv6Addr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    /// Classifies an address by its textual form: anything containing a colon is IPv6.
    pub fn from_literal(literal: &str) -> Self {
        if literal.contains(':') {
            IpFamily::V6
        } else {
            IpFamily::V4
        }
    }

    pub fn of(addr: &IpAddr) -> Self {
        Self::from_literal(&addr.to_string())
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpFamily::V4 => f.write_str("IPv4"),
            IpFamily::V6 => f.write_str("IPv6"),
        }
    }
}

/// Scope flags reported next to a resolved hostname. Informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddressClass {
    pub loopback: bool,
    pub link_local: bool,
    pub site_local: bool,
    pub multicast: bool,
}

impl AddressClass {
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => Self {
                loopback: v4.is_loopback(),
                link_local: v4.is_link_local(),
                site_local: v4.is_private(),
                multicast: v4.is_multicast(),
            },
            IpAddr::V6(v6) => Self {
                loopback: v6.is_loopback(),
                link_local: v6.is_unicast_link_local(),
                site_local: is_site_local_v6(v6),
                multicast: v6.is_multicast(),
            },
        }
    }
}

impl fmt::Display for AddressClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "loopback={} link-local={} site-local={} multicast={}",
            self.loopback, self.link_local, self.site_local, self.multicast
        )
    }
}

// fec0::/10, deprecated but still what "site local" means for IPv6.
fn is_site_local_v6(addr: &Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xffc0) == 0xfec0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ipv6AddressType {
    GlobalUnicast,
    UniqueLocal,
    LinkLocal,
    Other,
}

pub fn get_ipv6_type(addr: &Ipv6Addr) -> Ipv6AddressType {
    let first_byte = addr.octets()[0];
    if (0x20..=0x3F).contains(&first_byte) {
        Ipv6AddressType::GlobalUnicast
    } else if addr.is_unique_local() {
        Ipv6AddressType::UniqueLocal
    } else if addr.is_unicast_link_local() {
        Ipv6AddressType::LinkLocal
    } else {
        Ipv6AddressType::Other
    }
}

impl Ipv6AddressType {
    pub fn label(&self) -> &'static str {
        match self {
            Ipv6AddressType::GlobalUnicast => "GUA",
            Ipv6AddressType::UniqueLocal => "ULA",
            Ipv6AddressType::LinkLocal => "LLA",
            Ipv6AddressType::Other => "IPv6",
        }
    }
}

/// Parses the first IPv4 or IPv6 address out of a public-IP service reply.
///
/// Handles plain text replies (`203.0.113.7\n`) and the JSON shape
/// `{"ip": "203.0.113.7"}` / `{"origin": "203.0.113.7"}`.
pub fn parse_ip_reply(body: &str) -> Option<IpAddr> {
    let trimmed = body.trim();
    if let Ok(addr) = trimmed.parse::<IpAddr>() {
        return Some(addr);
    }

    trimmed
        .split(|c: char| c == '"' || c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .find_map(|token| token.parse::<IpAddr>().ok())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
