//! # Engine
//!
//! Owns a bounded pool of worker tasks and the registry of every run it accepted.
//!
//! **Lifecycle of a run:**
//! 1. [`Engine::start`] registers the run and queues it. It never waits for a
//!    worker; the admission queue is unbounded.
//! 2. A worker picks the job up and executes the matching probe. It is the only
//!    writer of the run's events.
//! 3. Events flow into a per-run channel as they happen and are buffered there
//!    until a consumer attaches through [`Engine::subscribe`] or
//!    [`Engine::start_with_events`].
//! 4. The terminal [`RunResult`] closes the stream and is published for
//!    [`Engine::await_result`].
//! 5. The finished run stays in the registry until it is dropped with
//!    [`Engine::forget`] or evicted. Only the most recent `retained_runs`
//!    finished runs are kept; evicting one also drops any events nobody consumed,
//!    and its handle becomes unknown.
//!
//! Whatever escapes a probe (an error or a panic) is caught here, recorded as a
//! final `Fault` event, and the worker moves on to the next job.

use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use futures::FutureExt;
use netlens_common::config::{Config, DEFAULT_RETAINED_RUNS};
use netlens_common::error::{EventError, ProbeError};
use netlens_common::probe::event::ProbeEvent;
use netlens_common::probe::request::ProbeRequest;
use netlens_common::probe::result::{RunResult, RunStatus, Summary};
use netlens_common::probe::stats::AggregateStatistics;
use netlens_common::probe::{ProbeKind, RunHandle};
use netlens_common::sink::{ResultSink, RunUpdate};
use netlens_common::transport::{HttpClient, Transport};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::probe::{self, RunContext};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("unknown run {0}")]
    UnknownRun(RunHandle),

    #[error("run {0} already has a consumer")]
    AlreadySubscribed(RunHandle),

    #[error("run {0} has not finished yet")]
    StillRunning(RunHandle),

    #[error("engine is shut down")]
    ShutDown,
}

/// The ordered updates of one run: every event, then exactly one `Finished`.
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<RunUpdate>,
    done: bool,
}

impl EventStream {
    fn new(rx: mpsc::UnboundedReceiver<RunUpdate>) -> Self {
        Self { rx, done: false }
    }

    /// Next update, or `None` once the terminal result has been handed out.
    pub async fn next(&mut self) -> Option<RunUpdate> {
        if self.done {
            return None;
        }
        let update = self.rx.recv().await;
        if matches!(update, Some(RunUpdate::Finished(_)) | None) {
            self.done = true;
        }
        update
    }

    /// Drains the stream into the events and the terminal result.
    pub async fn collect(mut self) -> (Vec<ProbeEvent>, Option<RunResult>) {
        let mut events = Vec::new();
        while let Some(update) = self.next().await {
            match update {
                RunUpdate::Event(event) => events.push(event),
                RunUpdate::Finished(result) => return (events, Some(result)),
            }
        }
        (events, None)
    }
}

struct RunEntry {
    cancel: CancellationToken,
    stream: Option<mpsc::UnboundedReceiver<RunUpdate>>,
    result: watch::Receiver<Option<RunResult>>,
}

struct Job {
    run: RunHandle,
    request: Arc<ProbeRequest>,
    cancel: CancellationToken,
    updates: mpsc::UnboundedSender<RunUpdate>,
    result: watch::Sender<Option<RunResult>>,
}

struct Registry {
    runs: HashMap<RunHandle, RunEntry>,
    /// Finished runs, oldest first.
    finished: VecDeque<RunHandle>,
    retain: usize,
}

impl Registry {
    fn retire(&mut self, run: RunHandle) {
        if !self.runs.contains_key(&run) {
            return;
        }
        self.finished.push_back(run);
        while self.finished.len() > self.retain {
            if let Some(oldest) = self.finished.pop_front() {
                self.runs.remove(&oldest);
                debug!("{oldest} evicted from the registry");
            }
        }
    }
}

struct Shared {
    registry: Mutex<Registry>,
    transport: Arc<dyn Transport>,
    http: Arc<dyn HttpClient>,
}

impl Shared {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub struct Engine {
    shared: Arc<Shared>,
    queue: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    next_id: AtomicU64,
}

impl Engine {
    /// Spawns `config.workers` workers on the current tokio runtime.
    pub fn new(config: &Config, transport: Arc<dyn Transport>, http: Arc<dyn HttpClient>) -> Self {
        Self::with_workers(config.workers, transport, http).retain_finished(config.retained_runs)
    }

    pub fn with_workers(
        workers: usize,
        transport: Arc<dyn Transport>,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        let workers = workers.max(1);
        let shared = Arc::new(Shared {
            registry: Mutex::new(Registry {
                runs: HashMap::new(),
                finished: VecDeque::new(),
                retain: DEFAULT_RETAINED_RUNS,
            }),
            transport,
            http,
        });

        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let handles = (0..workers)
            .map(|id| tokio::spawn(worker_loop(id, shared.clone(), rx.clone())))
            .collect();
        debug!("Engine started with {workers} worker(s)");

        Self {
            shared,
            queue: Mutex::new(Some(tx)),
            workers: Mutex::new(handles),
            next_id: AtomicU64::new(1),
        }
    }

    /// Keeps at most `limit` finished runs (at least one).
    pub fn retain_finished(self, limit: usize) -> Self {
        self.shared.registry().retain = limit.max(1);
        self
    }

    pub fn start(&self, request: ProbeRequest) -> Result<RunHandle, EngineError> {
        let queue = self.queue.lock().unwrap_or_else(|p| p.into_inner());
        let Some(queue) = queue.as_ref() else {
            return Err(EngineError::ShutDown);
        };

        let run = RunHandle::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let cancel = CancellationToken::new();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = watch::channel(None);

        self.shared.registry().runs.insert(
            run,
            RunEntry {
                cancel: cancel.clone(),
                stream: Some(updates_rx),
                result: result_rx,
            },
        );

        info!("{run} queued: {} {}", request.kind(), request.target());
        let job = Job {
            run,
            request: Arc::new(request),
            cancel,
            updates: updates_tx,
            result: result_tx,
        };

        if queue.send(job).is_err() {
            self.shared.registry().runs.remove(&run);
            return Err(EngineError::ShutDown);
        }
        Ok(run)
    }

    pub fn start_with_events(
        &self,
        request: ProbeRequest,
    ) -> Result<(RunHandle, EventStream), EngineError> {
        let run = self.start(request)?;
        let stream = self.take_stream(run)?;
        Ok((run, EventStream::new(stream)))
    }

    /// Attaches `sink` to `run`. Events recorded before this call are delivered
    /// first, in order. The returned task ends after `on_complete`.
    pub fn subscribe<S: ResultSink>(
        &self,
        run: RunHandle,
        mut sink: S,
    ) -> Result<JoinHandle<()>, EngineError> {
        let mut stream = EventStream::new(self.take_stream(run)?);

        Ok(tokio::spawn(async move {
            while let Some(update) = stream.next().await {
                match update {
                    RunUpdate::Event(event) => sink.on_event(&event),
                    RunUpdate::Finished(result) => sink.on_complete(&result),
                }
            }
        }))
    }

    fn take_stream(&self, run: RunHandle) -> Result<mpsc::UnboundedReceiver<RunUpdate>, EngineError> {
        let mut registry = self.shared.registry();
        let entry = registry.runs.get_mut(&run).ok_or(EngineError::UnknownRun(run))?;
        entry.stream.take().ok_or(EngineError::AlreadySubscribed(run))
    }

    pub fn cancel(&self, run: RunHandle) -> Result<(), EngineError> {
        let registry = self.shared.registry();
        let entry = registry.runs.get(&run).ok_or(EngineError::UnknownRun(run))?;
        entry.cancel.cancel();
        debug!("{run} cancellation requested");
        Ok(())
    }

    pub fn cancel_all(&self) {
        for entry in self.shared.registry().runs.values() {
            entry.cancel.cancel();
        }
    }

    /// Waits for the terminal result. Any number of callers may wait on one run.
    pub async fn await_result(&self, run: RunHandle) -> Result<RunResult, EngineError> {
        let mut rx = {
            let registry = self.shared.registry();
            registry
                .runs
                .get(&run)
                .ok_or(EngineError::UnknownRun(run))?
                .result
                .clone()
        };

        loop {
            if let Some(result) = rx.borrow_and_update().as_ref() {
                return Ok(result.clone());
            }
            // The sender only goes away without a result if the worker was torn down.
            if rx.changed().await.is_err() {
                return rx.borrow().clone().ok_or(EngineError::ShutDown);
            }
        }
    }

    /// Drops a finished run from the registry, together with any events nobody
    /// consumed. Its handle is unknown afterwards.
    pub fn forget(&self, run: RunHandle) -> Result<(), EngineError> {
        let mut registry = self.shared.registry();
        let finished = registry
            .runs
            .get(&run)
            .ok_or(EngineError::UnknownRun(run))?
            .result
            .borrow()
            .is_some();
        if !finished {
            return Err(EngineError::StillRunning(run));
        }

        registry.runs.remove(&run);
        registry.finished.retain(|r| *r != run);
        debug!("{run} forgotten");
        Ok(())
    }

    /// Cancels every run, stops accepting new ones and waits for the workers.
    pub async fn shutdown(&self) {
        self.cancel_all();
        self.queue.lock().unwrap_or_else(|p| p.into_inner()).take();

        let handles: Vec<JoinHandle<()>> = std::mem::take(
            &mut *self.workers.lock().unwrap_or_else(|p| p.into_inner()),
        );
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Worker ended abnormally: {e}");
            }
        }
        debug!("Engine shut down");
    }
}

async fn worker_loop(
    id: usize,
    shared: Arc<Shared>,
    queue: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Job>>>,
) {
    loop {
        let job = {
            let mut rx = queue.lock().await;
            rx.recv().await
        };
        let Some(job) = job else {
            break;
        };
        debug!("Worker {id} picked up {}", job.run);
        execute(&shared, job).await;
    }
    debug!("Worker {id} stopped");
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "probe panicked".to_string()
    }
}

async fn execute(shared: &Shared, job: Job) {
    let Job {
        run,
        request,
        cancel,
        updates,
        result: result_tx,
    } = job;

    let started = Instant::now();
    let kind = request.kind();
    let mut ctx = RunContext::new(
        run,
        request.target(),
        updates.clone(),
        cancel.clone(),
        shared.transport.clone(),
        shared.http.clone(),
    );

    let (status, summary, error) = if cancel.is_cancelled() {
        (RunStatus::Cancelled, None, None)
    } else {
        let probe = probe::for_params(request.params());
        let outcome = AssertUnwindSafe(probe.run(&mut ctx)).catch_unwind().await;

        match outcome {
            Ok(Ok(outcome)) => (outcome.status, Some(outcome.summary), None),
            Ok(Err(ProbeError::Cancelled)) => (RunStatus::Cancelled, None, None),
            Ok(Err(e)) => settle_failure(&mut ctx, e),
            Err(payload) => {
                let e = ProbeError::Internal(panic_message(payload));
                warn!("{run} {kind} panicked: {e}");
                settle_failure(&mut ctx, e)
            }
        }
    };

    let result = finish(run, kind, request.target(), status, summary, error, ctx, started.elapsed());
    info!("{result}");

    shared.registry().retire(run);
    let _ = updates.send(RunUpdate::Finished(result.clone()));
    let _ = result_tx.send(Some(result));
}

fn settle_failure(
    ctx: &mut RunContext,
    err: ProbeError,
) -> (RunStatus, Option<Summary>, Option<EventError>) {
    ctx.record_fault(&err);
    let status = if ctx.has_success() {
        RunStatus::PartiallyCompleted
    } else {
        RunStatus::Failed
    };
    (status, None, Some(EventError::from(&err)))
}

#[allow(clippy::too_many_arguments)]
fn finish(
    run: RunHandle,
    kind: ProbeKind,
    target: &str,
    status: RunStatus,
    summary: Option<Summary>,
    error: Option<EventError>,
    ctx: RunContext,
    elapsed: Duration,
) -> RunResult {
    let events = ctx.into_events();
    RunResult {
        run,
        kind,
        target: target.to_string(),
        status,
        statistics: AggregateStatistics::from_events(&events),
        summary,
        events,
        elapsed,
        error,
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
