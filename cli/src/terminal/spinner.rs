//! Terminal subscriber setup and the progress spinner shown while runs are active.
//!
//! Spinners are spans: any span created with `indicatif.pb_show = true` gets a
//! progress line from the `tracing-indicatif` layer, and log lines are written
//! through the layer's writer so they never tear a spinner.

use colored::*;
use indicatif::ProgressStyle;
use tracing::{Span, info_span};
use tracing_indicatif::IndicatifLayer;
use tracing_indicatif::filter::IndicatifFilter;
use tracing_indicatif::span_ext::IndicatifSpanExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::terminal::logging::NetlensFormatter;

const DEFAULT_FILTER: &str = "info,netlens_core=warn";
const TICKS: &[&str] = &[
    "▁▁▁▁▁",
    "▁▂▂▂▁",
    "▁▄▂▄▁",
    "▂▄▆▄▂",
    "▄▆█▆▄",
    "▂▄▆▄▂",
    "▁▄▂▄▁",
    "▁▂▂▂▁",
];
const TIP: &str = "press 'q' to finish early";

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS)
}

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging() -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let indicatif_layer = IndicatifLayer::new().with_progress_style(spinner_style());
    let fmt_layer = fmt::layer()
        .event_format(NetlensFormatter)
        .with_writer(indicatif_layer.get_stdout_writer());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(indicatif_layer.with_filter(IndicatifFilter::new(false)))
        .try_init()?;
    Ok(())
}

/// Handle on the spinner of one command. Cloned into every sink of the command.
#[derive(Clone)]
pub struct Progress {
    span: Span,
}

impl Progress {
    pub fn start(label: &str, interactive: bool) -> Self {
        let span = info_span!("progress", indicatif.pb_show = true);
        let message = if interactive {
            format!("{label} {}", format!("({TIP})").italic().white())
        } else {
            label.to_string()
        };
        span.pb_set_message(&message);
        Self { span }
    }

    pub fn span(&self) -> Span {
        self.span.clone()
    }

    pub fn set_message(&self, msg: &str) {
        self.span.pb_set_message(msg);
    }
}
