//! Consumers of run output.
//!
//! A [`ResultSink`] sees every event of one run in sequence order, then the
//! terminal result exactly once. Sinks are driven from a task owned by the
//! engine; marshalling onto another thread is up to the implementation.

use std::sync::mpsc;

use crate::probe::event::ProbeEvent;
use crate::probe::result::RunResult;

pub trait ResultSink: Send + 'static {
    fn on_event(&mut self, event: &ProbeEvent);

    fn on_complete(&mut self, result: &RunResult);
}

/// One item of a run's update stream.
#[derive(Debug, Clone, PartialEq)]
pub enum RunUpdate {
    Event(ProbeEvent),
    Finished(RunResult),
}

/// Forwards updates to a plain channel, for callers living on their own thread.
impl ResultSink for mpsc::Sender<RunUpdate> {
    fn on_event(&mut self, event: &ProbeEvent) {
        let _ = self.send(RunUpdate::Event(event.clone()));
    }

    fn on_complete(&mut self, result: &RunResult) {
        let _ = self.send(RunUpdate::Finished(result.clone()));
    }
}
