use std::time::Duration;

use crate::terminal::colors;
use colored::*;
use netlens_common::probe::event::{EventStatus, ProbeEvent};
use netlens_common::probe::result::{RunResult, RunStatus};
use netlens_common::probe::stats::{AggregateStatistics, QualityRating};

type Detail = (String, ColoredString);

pub fn status_symbol(status: EventStatus) -> ColoredString {
    match status {
        EventStatus::Success => "✔".color(colors::SUCCESS),
        EventStatus::Failure => "✘".color(colors::FAILURE),
        EventStatus::Timeout => "⧗".color(colors::TIMEOUT),
    }
}

pub fn run_status(status: RunStatus) -> ColoredString {
    let label = status.to_string();
    match status {
        RunStatus::Completed => label.color(colors::SUCCESS).bold(),
        RunStatus::PartiallyCompleted => label.color(colors::ACCENT).bold(),
        RunStatus::Failed => label.color(colors::FAILURE).bold(),
        RunStatus::Cancelled => label.color(colors::SEPARATOR).bold(),
    }
}

pub fn quality(rating: QualityRating) -> ColoredString {
    let label = rating.to_string();
    match rating {
        QualityRating::Excellent | QualityRating::Good => label.color(colors::SUCCESS),
        QualityRating::Fair => label.color(colors::ACCENT),
        QualityRating::Poor => label.color(colors::FAILURE),
    }
}

pub fn millis(duration: Duration) -> String {
    format!("{:.1} ms", duration.as_secs_f64() * 1000.0)
}

/// One event as a terminal line. `with_target` prefixes the target for batch output.
pub fn event_line(event: &ProbeEvent, with_target: bool) -> String {
    let mut line = format!(
        "{} {} {}",
        status_symbol(event.status),
        format!("{:>3}", event.step).color(colors::SEPARATOR),
        event.observation.to_string().color(colors::TEXT_DEFAULT)
    );
    if with_target {
        line = format!("{} {line}", format!("{:<16}", event.target).color(colors::SECONDARY));
    }
    if let Some(err) = &event.error {
        line.push_str(&format!(" {}", format!("({err})").color(colors::SEPARATOR)));
    }
    line
}

/// Key/value rows describing a finished run.
pub fn result_details(result: &RunResult) -> Vec<Detail> {
    let mut details: Vec<Detail> = vec![("Status".to_string(), run_status(result.status))];

    if let Some(summary) = &result.summary {
        details.push(("Summary".to_string(), summary.to_string().normal()));
    }

    if let AggregateStatistics::Latency(stats) = &result.statistics {
        details.push((
            "Latency".to_string(),
            format!(
                "min {} / mean {} / max {}",
                millis(stats.min),
                millis(stats.mean),
                millis(stats.max)
            )
            .normal(),
        ));
    }

    if let Some(rating) = result.quality() {
        details.push(("Quality".to_string(), quality(rating)));
    }

    if let Some(err) = &result.error {
        details.push(("Error".to_string(), err.to_string().color(colors::FAILURE)));
    }

    details.push((
        "Elapsed".to_string(),
        format!("{:.2}s", result.elapsed.as_secs_f64()).color(colors::ACCENT),
    ));
    details
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
