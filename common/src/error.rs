//! # Error taxonomy
//!
//! Every network step returns `Result<_, ProbeError>`. Probes convert step errors
//! into Failure/Timeout events; the engine converts whatever escapes a probe into a
//! final `Fault` event. [`ErrorKind`] is the flat, copyable tag carried on events so
//! a sink never has to inspect the error itself.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Resolution,
    Timeout,
    ConnectionRefused,
    Unreachable,
    Io,
    Http,
    Cancelled,
    InvalidRequest,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Resolution => "ResolutionFailure",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::ConnectionRefused => "ConnectionRefused",
            ErrorKind::Unreachable => "Unreachable",
            ErrorKind::Io => "IOError",
            ErrorKind::Http => "HttpError",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::InvalidRequest => "InvalidRequest",
            ErrorKind::Internal => "InternalError",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("unable to resolve {host}: {reason}")]
    Resolution { host: String, reason: String },

    #[error("timed out after {} ms", .after.as_millis())]
    Timeout { after: Duration },

    #[error("connection refused by {addr}")]
    ConnectionRefused { addr: SocketAddr },

    #[error("{addr} is unreachable: {reason}")]
    Unreachable { addr: SocketAddr, reason: String },

    #[error("i/o error: {0}")]
    Io(String),

    #[error("unexpected HTTP status {status}")]
    Http { status: u16 },

    #[error("run cancelled")]
    Cancelled,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("probe crashed: {0}")]
    Internal(String),
}

impl ProbeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProbeError::Resolution { .. } => ErrorKind::Resolution,
            ProbeError::Timeout { .. } => ErrorKind::Timeout,
            ProbeError::ConnectionRefused { .. } => ErrorKind::ConnectionRefused,
            ProbeError::Unreachable { .. } => ErrorKind::Unreachable,
            ProbeError::Io(_) => ErrorKind::Io,
            ProbeError::Http { .. } => ErrorKind::Http,
            ProbeError::Cancelled => ErrorKind::Cancelled,
            ProbeError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            ProbeError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ProbeError::Timeout { .. })
    }

    pub fn resolution(host: &str, reason: impl fmt::Display) -> Self {
        ProbeError::Resolution {
            host: host.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Classifies a socket error raised while talking to `addr`.
    pub fn from_io(err: io::Error, addr: SocketAddr) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => ProbeError::ConnectionRefused { addr },
            io::ErrorKind::HostUnreachable | io::ErrorKind::NetworkUnreachable => {
                ProbeError::Unreachable {
                    addr,
                    reason: err.to_string(),
                }
            }
            io::ErrorKind::TimedOut => ProbeError::Timeout {
                after: Duration::ZERO,
            },
            _ => ProbeError::Io(err.to_string()),
        }
    }
}

/// The error detail attached to a non-successful event or run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&ProbeError> for EventError {
    fn from(err: &ProbeError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<ProbeError> for EventError {
    fn from(err: ProbeError) -> Self {
        EventError::from(&err)
    }
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), 80)
    }

    #[test]
    fn io_errors_are_classified_by_kind() {
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert_eq!(
            ProbeError::from_io(refused, addr()).kind(),
            ErrorKind::ConnectionRefused
        );

        let unreachable = io::Error::from(io::ErrorKind::HostUnreachable);
        assert_eq!(
            ProbeError::from_io(unreachable, addr()).kind(),
            ErrorKind::Unreachable
        );

        let other = io::Error::other("boom");
        assert_eq!(ProbeError::from_io(other, addr()).kind(), ErrorKind::Io);
    }

    #[test]
    fn event_error_keeps_kind_and_message() {
        let err = ProbeError::resolution("nowhere.invalid", "no records found");
        let detail = EventError::from(&err);
        assert_eq!(detail.kind, ErrorKind::Resolution);
        assert!(detail.message.contains("nowhere.invalid"));
        assert_eq!(detail.kind.to_string(), "ResolutionFailure");
    }
}
