pub mod info;
pub mod probe;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use netlens_common::network::ports::PortSelection;
use netlens_common::probe::request::Direction;

#[derive(Parser)]
#[command(name = "netlens", version)]
#[command(about = "Network diagnostics: ping, DNS, port scan, traceroute and throughput.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// YAML configuration file (defaults to $NETLENS_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of runs executed concurrently
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Less output; repeat for even less
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub quiet: u8,

    /// Do not listen for 'q' to finish early
    #[arg(long, global = true)]
    pub no_input: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Measure TCP round trips to a host
    #[command(alias = "p")]
    Ping {
        #[arg(required_unless_present = "defaults")]
        target: Option<String>,
        /// Number of attempts
        #[arg(short = 'c', long, value_parser = clap::value_parser!(u32).range(1..))]
        count: Option<u32>,
        /// Per-attempt timeout in milliseconds
        #[arg(short = 't', long = "timeout", value_parser = clap::value_parser!(u64).range(1..))]
        timeout_ms: Option<u64>,
        /// Ping the configured default hosts instead
        #[arg(long, conflicts_with = "target")]
        defaults: bool,
    },
    /// Resolve a host, or reverse-resolve an address
    #[command(alias = "d")]
    Dns {
        #[arg(required_unless_present = "defaults")]
        target: Option<String>,
        /// Look up the name of an address
        #[arg(long)]
        reverse: bool,
        /// Resolve the configured default hosts instead
        #[arg(long, conflicts_with_all = ["target", "reverse"])]
        defaults: bool,
    },
    /// Scan TCP ports of a host
    #[command(alias = "s")]
    Scan {
        #[arg(required_unless_present = "defaults")]
        target: Option<String>,
        /// `common`, a single port or a range such as 80-90
        #[arg(short, long, default_value = "common")]
        ports: PortSelection,
        /// Scan the configured default hosts instead
        #[arg(long, conflicts_with = "target")]
        defaults: bool,
    },
    /// Approximate the hop distance to a host
    #[command(alias = "t")]
    Trace {
        #[arg(required_unless_present = "defaults")]
        target: Option<String>,
        /// Short hop budget and timeouts
        #[arg(long)]
        quick: bool,
        /// Trace the configured default hosts instead
        #[arg(long, conflicts_with = "target")]
        defaults: bool,
    },
    /// Measure latency and transfer rates against HTTP endpoints
    Speed {
        /// both, download or upload
        #[arg(long, default_value = "both")]
        direction: Direction,
    },
    /// Resolve a host, ping it and rate the connection
    #[command(alias = "g")]
    Diag {
        #[arg(default_value = "google.com")]
        target: String,
    },
    /// Show networking information about this device
    #[command(alias = "i")]
    Info,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
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
    use clap::CommandFactory;

    #[test]
    fn command_line_is_consistent() {
        CommandLine::command().debug_assert();
    }

    #[test]
    fn ping_flags() {
        let cli = CommandLine::parse_from(["netlens", "ping", "example.com", "-c", "3", "-t", "800"]);
        let Commands::Ping {
            target,
            count,
            timeout_ms,
            defaults,
        } = cli.command
        else {
            panic!("expected ping");
        };
        assert_eq!(target.as_deref(), Some("example.com"));
        assert_eq!(count, Some(3));
        assert_eq!(timeout_ms, Some(800));
        assert!(!defaults);
    }

    #[test]
    fn zero_attempts_are_rejected() {
        assert!(CommandLine::try_parse_from(["netlens", "ping", "example.com", "-c", "0"]).is_err());
    }

    #[test]
    fn target_is_required_without_defaults() {
        assert!(CommandLine::try_parse_from(["netlens", "scan"]).is_err());
        assert!(CommandLine::try_parse_from(["netlens", "scan", "--defaults"]).is_ok());
        assert!(CommandLine::try_parse_from(["netlens", "trace", "a.test", "--defaults"]).is_err());
    }

    #[test]
    fn port_ranges_and_globals() {
        let cli = CommandLine::parse_from(["netlens", "-qq", "s", "example.com", "-p", "80-90"]);
        assert_eq!(cli.quiet, 2);
        let Commands::Scan { ports, .. } = cli.command else {
            panic!("expected scan");
        };
        assert_eq!(ports.len(), 11);
    }

    #[test]
    fn speed_direction() {
        let cli = CommandLine::parse_from(["netlens", "speed", "--direction", "up"]);
        let Commands::Speed { direction } = cli.command else {
            panic!("expected speed");
        };
        assert_eq!(direction, Direction::Upload);
        assert!(CommandLine::try_parse_from(["netlens", "speed", "--direction", "sideways"]).is_err());
    }

    #[test]
    fn diag_target_defaults_to_google() {
        let cli = CommandLine::parse_from(["netlens", "g"]);
        let Commands::Diag { target } = cli.command else {
            panic!("expected diag");
        };
        assert_eq!(target, "google.com");

        let cli = CommandLine::parse_from(["netlens", "diag", "example.com"]);
        assert!(matches!(cli.command, Commands::Diag { target } if target == "example.com"));
    }
}
