mod commands;
mod terminal;

use std::sync::Arc;

use commands::{CommandLine, Commands, info, probe};
use netlens_common::config::load_config;
use terminal::{print, spinner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    spinner::init_logging()?;
    print::initialize(commands.quiet);

    let mut config = load_config(commands.config.as_deref())?;
    if let Some(workers) = commands.workers {
        config.workers = workers.max(1);
    }

    print::banner();

    let diagnostics = matches!(commands.command, Commands::Diag { .. });
    let requests = match commands.command {
        Commands::Info => {
            print::header("about this device");
            return info::info(&config).await;
        }
        Commands::Ping {
            target,
            count,
            timeout_ms,
            defaults,
        } => {
            print::header("ping");
            probe::ping_requests(&config, target, count, timeout_ms, defaults)
        }
        Commands::Dns {
            target,
            reverse,
            defaults,
        } => {
            print::header(if reverse { "reverse dns" } else { "dns lookup" });
            probe::dns_requests(&config, target, reverse, defaults)
        }
        Commands::Scan {
            target,
            ports,
            defaults,
        } => {
            print::header(&format!("port scan ({ports})"));
            probe::scan_requests(&config, target, ports, defaults)
        }
        Commands::Trace {
            target,
            quick,
            defaults,
        } => {
            print::header("traceroute (approximated)");
            probe::trace_requests(&config, target, quick, defaults)
        }
        Commands::Speed { direction } => {
            print::header("throughput");
            probe::speed_requests(&config, direction)
        }
        Commands::Diag { target } => {
            print::header(&format!("network diagnostics for {target}"));
            probe::diag_requests(&config, target)
        }
    };

    let engine = Arc::new(netlens_core::system_engine(&config)?);
    let listen_for_keys = !commands.no_input;
    let outcome = if diagnostics {
        probe::diag(engine.clone(), requests, listen_for_keys).await
    } else {
        probe::probe(engine.clone(), requests, listen_for_keys).await
    };
    engine.shutdown().await;
    outcome
}
