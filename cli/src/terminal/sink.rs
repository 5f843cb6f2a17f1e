//! The [`ResultSink`] that renders runs on the terminal as they progress.

use netlens_common::probe::event::ProbeEvent;
use netlens_common::probe::result::{RunResult, RunStatus};
use netlens_common::sink::ResultSink;
use netlens_common::{error, success, warn};

use crate::terminal::spinner::Progress;
use crate::terminal::{format, print};

pub struct TerminalSink {
    progress: Progress,
    batch: bool,
}

impl TerminalSink {
    pub fn new(progress: Progress, batch: bool) -> Self {
        Self { progress, batch }
    }
}

impl ResultSink for TerminalSink {
    fn on_event(&mut self, event: &ProbeEvent) {
        self.progress
            .set_message(&format!("{} step {}", event.target, event.step));
        if print::quiet() == 0 {
            print::print(&format::event_line(event, self.batch));
        }
    }

    fn on_complete(&mut self, result: &RunResult) {
        if print::quiet() > 1 {
            return;
        }
        match result.status {
            RunStatus::Completed => success!("{result}"),
            RunStatus::PartiallyCompleted | RunStatus::Cancelled => warn!("{result}"),
            RunStatus::Failed => error!("{result}"),
        }
    }
}
