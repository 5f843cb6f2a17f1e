//! # Port selection and the well-known service table
//!
//! A port scan runs either over the fixed table of common ports or over an
//! explicit inclusive range. Parsing mirrors the CLI input forms:
//! * **Keyword**: "common" (case-insensitive).
//! * **Single port**: "443".
//! * **Range**: "80-90" (inclusive, start <= end).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Well-known ports probed by a default scan, in scan order.
pub const COMMON_PORTS: [(u16, &str); 13] = [
    (21, "FTP"),
    (22, "SSH"),
    (23, "Telnet"),
    (25, "SMTP"),
    (53, "DNS"),
    (80, "HTTP"),
    (110, "POP3"),
    (143, "IMAP"),
    (443, "HTTPS"),
    (993, "IMAPS"),
    (995, "POP3S"),
    (8080, "HTTP-Alt"),
    (8443, "HTTPS-Alt"),
];

pub const DEFAULT_RANGE: (u16, u16) = (80, 90);

static SERVICE_TABLE: OnceLock<BTreeMap<u16, &'static str>> = OnceLock::new();

fn service_table() -> &'static BTreeMap<u16, &'static str> {
    SERVICE_TABLE.get_or_init(|| COMMON_PORTS.iter().copied().collect())
}

/// Looks up the service name registered for `port`, if it is a well-known one.
pub fn service_name(port: u16) -> Option<&'static str> {
    service_table().get(&port).copied()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PortSelection {
    #[default]
    Common,
    Range { start: u16, end: u16 },
}

impl PortSelection {
    pub fn range(start: u16, end: u16) -> Result<Self, String> {
        if start == 0 {
            return Err("port 0 cannot be scanned".to_string());
        }
        if start > end {
            return Err(format!("invalid port range: {start}-{end}"));
        }
        Ok(PortSelection::Range { start, end })
    }

    pub fn ports(&self) -> Vec<u16> {
        match self {
            PortSelection::Common => COMMON_PORTS.iter().map(|(port, _)| *port).collect(),
            PortSelection::Range { start, end } => (*start..=*end).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PortSelection::Common => COMMON_PORTS.len(),
            PortSelection::Range { start, end } => (*end - *start) as usize + 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromStr for PortSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("common") {
            return Ok(PortSelection::Common);
        }

        let Some((start_str, end_str)) = trimmed.split_once('-') else {
            let port = parse_port(trimmed)?;
            return PortSelection::range(port, port);
        };

        let start = parse_port(start_str)?;
        let end = parse_port(end_str)?;
        PortSelection::range(start, end)
    }
}

fn parse_port(s: &str) -> Result<u16, String> {
    s.trim()
        .parse::<u16>()
        .map_err(|e| format!("invalid port '{}': {e}", s.trim()))
}

impl fmt::Display for PortSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortSelection::Common => write!(f, "{} common ports", COMMON_PORTS.len()),
            PortSelection::Range { start, end } if start == end => write!(f, "port {start}"),
            PortSelection::Range { start, end } => write!(f, "ports {start}-{end}"),
        }
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
