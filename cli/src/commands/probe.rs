//! The probe commands: building requests from the command line and driving them
//! through the engine.
//!
//! Every command submits one request per target. With `--defaults` the targets
//! come from the configured host lists and the batch timing profile is used; the
//! runs then share the engine's worker pool and report as they finish.
//!
//! `diag` is the exception: three runs against one host, reported as sections.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use colored::*;
use netlens_common::config::Config;
use netlens_common::network::ports::PortSelection;
use netlens_common::probe::request::{Direction, Mode, PingParams, ProbeRequest};
use netlens_common::probe::result::{RunResult, RunStatus};
use netlens_common::{success, warn};
use netlens_core::Engine;
use tracing::Instrument;

use crate::mprint;
use crate::terminal::input::InputHandle;
use crate::terminal::sink::TerminalSink;
use crate::terminal::spinner::Progress;
use crate::terminal::{colors, format, print};

const DIAG_PINGS: u32 = 3;
const DIAG_PING_TIMEOUT: Duration = Duration::from_secs(3);
const DIAG_ASSESSMENT_TIMEOUT: Duration = Duration::from_secs(5);
const DIAG_SECTIONS: [&str; 3] = ["dns resolution", "ping test", "connection quality"];

fn targets(target: Option<String>, defaults: bool, hosts: &[String]) -> (Vec<String>, Mode) {
    match target {
        Some(target) if !defaults => (vec![target], Mode::Single),
        _ => (hosts.to_vec(), Mode::Batch),
    }
}

pub fn ping_requests(
    config: &Config,
    target: Option<String>,
    count: Option<u32>,
    timeout_ms: Option<u64>,
    defaults: bool,
) -> Vec<ProbeRequest> {
    let (targets, mode) = targets(target, defaults, &config.hosts.ping);
    let mut params = config.ping.params(mode);
    if let Some(count) = count {
        params.attempts = count;
    }
    if let Some(timeout_ms) = timeout_ms {
        params.timeout = Duration::from_millis(timeout_ms);
    }

    targets
        .into_iter()
        .map(|target| ProbeRequest::ping(target, params.clone()))
        .collect()
}

pub fn dns_requests(
    config: &Config,
    target: Option<String>,
    reverse: bool,
    defaults: bool,
) -> Vec<ProbeRequest> {
    let (targets, mode) = targets(target, defaults, &config.hosts.dns);
    let mut params = config.dns.params(mode);
    if reverse {
        params = params.reverse();
    }

    targets
        .into_iter()
        .map(|target| ProbeRequest::dns(target, params.clone()))
        .collect()
}

pub fn scan_requests(
    config: &Config,
    target: Option<String>,
    ports: PortSelection,
    defaults: bool,
) -> Vec<ProbeRequest> {
    let (targets, _) = targets(target, defaults, &config.hosts.scan);
    let params = config.scan.params(ports);

    targets
        .into_iter()
        .map(|target| ProbeRequest::port_scan(target, params.clone()))
        .collect()
}

pub fn trace_requests(
    config: &Config,
    target: Option<String>,
    quick: bool,
    defaults: bool,
) -> Vec<ProbeRequest> {
    let (targets, mode) = targets(target, defaults, &config.hosts.trace);
    let mode = if quick { Mode::Batch } else { mode };
    let params = config.trace.params(mode);

    targets
        .into_iter()
        .map(|target| ProbeRequest::traceroute(target, params.clone()))
        .collect()
}

pub fn speed_requests(config: &Config, direction: Direction) -> Vec<ProbeRequest> {
    vec![ProbeRequest::throughput(config.throughput.params(direction))]
}

/// Forward lookup, three back-to-back pings and one single-shot ping whose
/// round trip rates the connection.
pub fn diag_requests(config: &Config, target: String) -> Vec<ProbeRequest> {
    let ping = PingParams {
        attempts: DIAG_PINGS,
        timeout: DIAG_PING_TIMEOUT,
        interval: Duration::ZERO,
        ..config.ping.params(Mode::Single)
    };
    let assessment = PingParams {
        attempts: 1,
        timeout: DIAG_ASSESSMENT_TIMEOUT,
        ..ping.clone()
    };

    vec![
        ProbeRequest::dns(target.clone(), config.dns.params(Mode::Single)),
        ProbeRequest::ping(target.clone(), ping),
        ProbeRequest::ping(target, assessment),
    ]
}

/// Starts every request in order. When one cannot be started, the runs already
/// started are cancelled before the error is returned.
fn submit_all<T>(
    requests: Vec<ProbeRequest>,
    mut start: impl FnMut(ProbeRequest) -> anyhow::Result<T>,
    cancel_all: impl FnOnce(),
) -> anyhow::Result<Vec<T>> {
    let mut started = Vec::with_capacity(requests.len());
    for request in requests {
        match start(request) {
            Ok(run) => started.push(run),
            Err(e) => {
                cancel_all();
                return Err(e);
            }
        }
    }
    Ok(started)
}

/// Submits `requests`, renders their events and waits for every result.
///
/// 'q' or Ctrl-C cancels every run; the results of cancelled runs are still returned.
pub async fn execute(
    engine: Arc<Engine>,
    requests: Vec<ProbeRequest>,
    listen_for_keys: bool,
) -> anyhow::Result<Vec<RunResult>> {
    if requests.is_empty() {
        anyhow::bail!("no targets to probe, check the host lists of the configuration");
    }

    let batch = requests.len() > 1;
    let label = match requests.as_slice() {
        [single] => format!("{} {}", single.kind(), single.target()),
        [first, rest @ ..] if rest.iter().all(|r| r.target() == first.target()) => {
            format!("{} runs against {}", requests.len(), first.target())
        }
        [first, ..] => format!("{} {} targets", first.kind(), requests.len()),
        [] => String::new(),
    };

    let input = if listen_for_keys {
        let canceller = engine.clone();
        InputHandle::start(move || canceller.cancel_all())
    } else {
        None
    };
    let progress = Progress::start(&label, input.is_some());

    let interrupt = {
        let engine = engine.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling every run");
                engine.cancel_all();
            }
        })
    };

    let collected = async {
        let runs = submit_all(
            requests,
            |request| {
                let run = engine.start(request)?;
                let printer = engine.subscribe(run, TerminalSink::new(progress.clone(), batch))?;
                Ok((run, printer))
            },
            || engine.cancel_all(),
        )?;

        let mut results = Vec::with_capacity(runs.len());
        for (run, printer) in runs {
            let result = engine.await_result(run).await?;
            printer.await.context("event printer stopped")?;
            results.push(result);
        }
        anyhow::Ok(results)
    }
    .instrument(progress.span())
    .await;

    interrupt.abort();
    drop(input);
    collected
}

/// Prints the per-run details and the closing line.
pub fn report(results: &[RunResult], total_time: Duration) {
    if print::quiet() == 0 {
        mprint!();
        print::header("results");
        for (idx, result) in results.iter().enumerate() {
            print::tree_head(idx, &format!("{} {}", result.kind, result.target));
            print::as_tree_one_level(format::result_details(result));
            if idx + 1 != results.len() {
                mprint!();
            }
        }
    }

    closing_line(results, total_time);
}

/// Prints the diagnostics runs one section each, in submission order.
pub fn report_diag(results: &[RunResult], total_time: Duration) {
    if print::quiet() == 0 {
        for (result, section) in results.iter().zip(DIAG_SECTIONS) {
            mprint!();
            print::header(section);
            print::as_tree_one_level(format::result_details(result));
        }
    }
    closing_line(results, total_time);
}

fn closing_line(results: &[RunResult], total_time: Duration) {
    let count = |status: RunStatus| results.iter().filter(|r| r.status == status).count();
    let completed: ColoredString = format!("{} completed", count(RunStatus::Completed))
        .bold()
        .green();
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
    let mut output = format!("{completed}");
    for (status, label) in [
        (RunStatus::PartiallyCompleted, "partial"),
        (RunStatus::Failed, "failed"),
        (RunStatus::Cancelled, "cancelled"),
    ] {
        let n = count(status);
        if n > 0 {
            output.push_str(&format!(", {n} {label}"));
        }
    }
    let output: ColoredString = format!("{output} in {total_time}").color(colors::TEXT_DEFAULT);

    match print::quiet() {
        0 => {
            print::fat_separator();
            print::centerln(&output);
        }
        _ => success!("{}", output),
    }
}

/// Runs `requests` end to end. Fails only when no run got anywhere.
pub async fn probe(
    engine: Arc<Engine>,
    requests: Vec<ProbeRequest>,
    listen_for_keys: bool,
) -> anyhow::Result<()> {
    run_reported(engine, requests, listen_for_keys, report).await
}

/// Like [`probe`], for the requests of [`diag_requests`].
pub async fn diag(
    engine: Arc<Engine>,
    requests: Vec<ProbeRequest>,
    listen_for_keys: bool,
) -> anyhow::Result<()> {
    run_reported(engine, requests, listen_for_keys, report_diag).await
}

async fn run_reported(
    engine: Arc<Engine>,
    requests: Vec<ProbeRequest>,
    listen_for_keys: bool,
    report: fn(&[RunResult], Duration),
) -> anyhow::Result<()> {
    let start_time = Instant::now();
    let results = execute(engine, requests, listen_for_keys).await?;
    report(&results, start_time.elapsed());

    if results.iter().all(|r| r.status == RunStatus::Failed) {
        anyhow::bail!("every run failed");
    }
    Ok(())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
