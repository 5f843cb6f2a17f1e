//! # Probes
//!
//! A probe turns one [`ProbeRequest`](netlens_common::probe::request::ProbeRequest)
//! into an ordered sequence of events and a final [`ProbeOutcome`].
//!
//! **Contract:**
//! * Events go through [`RunContext::record`] / [`RunContext::record_error`], never
//!   anywhere else, so sequence numbers stay gapless.
//! * Between two discrete steps, and while waiting out an inter-step delay, a probe
//!   calls [`RunContext::checkpoint`] / [`RunContext::pause`] and bails out with
//!   `ProbeError::Cancelled` when asked to.
//! * Per-step failures become events. Only errors that make the rest of the run
//!   meaningless (the target does not resolve) are returned.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use netlens_common::error::{EventError, ProbeError};
use netlens_common::probe::RunHandle;
use netlens_common::probe::event::{EventStatus, Observation, ProbeEvent};
use netlens_common::probe::request::ProbeParams;
use netlens_common::probe::result::ProbeOutcome;
use netlens_common::sink::RunUpdate;
use netlens_common::transport::{HttpClient, Transport};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub mod dns;
pub mod ping;
pub mod port_scan;
pub mod throughput;
pub mod traceroute;

#[async_trait]
pub trait Probe: Send + Sync {
    async fn run(&self, ctx: &mut RunContext) -> Result<ProbeOutcome, ProbeError>;
}

/// Picks the probe implementation matching the request parameters.
pub fn for_params(params: &ProbeParams) -> Box<dyn Probe> {
    match params {
        ProbeParams::Ping(p) => Box::new(ping::PingProbe::new(p.clone())),
        ProbeParams::Dns(p) => Box::new(dns::DnsProbe::new(p.clone())),
        ProbeParams::PortScan(p) => Box::new(port_scan::PortScanProbe::new(p.clone())),
        ProbeParams::Traceroute(p) => Box::new(traceroute::TracerouteProbe::new(p.clone())),
        ProbeParams::Throughput(p) => Box::new(throughput::ThroughputProbe::new(p.clone())),
    }
}

/// Everything a probe may touch while it runs.
///
/// Owned by the worker executing the run; it is the only writer of the run's
/// events.
pub struct RunContext {
    run: RunHandle,
    target: String,
    seq: u64,
    events: Vec<ProbeEvent>,
    updates: UnboundedSender<RunUpdate>,
    cancel: CancellationToken,
    transport: Arc<dyn Transport>,
    http: Arc<dyn HttpClient>,
}

impl RunContext {
    pub fn new(
        run: RunHandle,
        target: impl Into<String>,
        updates: UnboundedSender<RunUpdate>,
        cancel: CancellationToken,
        transport: Arc<dyn Transport>,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            run,
            target: target.into(),
            seq: 0,
            events: Vec::new(),
            updates,
            cancel,
            transport,
            http,
        }
    }

    pub fn run(&self) -> RunHandle {
        self.run
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn http(&self) -> &dyn HttpClient {
        self.http.as_ref()
    }

    pub fn events(&self) -> &[ProbeEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<ProbeEvent> {
        self.events
    }

    pub fn has_success(&self) -> bool {
        self.events.iter().any(ProbeEvent::is_success)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn emit(
        &mut self,
        step: u32,
        status: EventStatus,
        observation: Observation,
        error: Option<EventError>,
    ) {
        self.seq += 1;
        let event = ProbeEvent {
            run: self.run,
            seq: self.seq,
            target: self.target.clone(),
            step,
            status,
            observation,
            error,
        };
        debug!("{event}");

        // Nobody listening is fine, the result still carries every event.
        let _ = self.updates.send(RunUpdate::Event(event.clone()));
        self.events.push(event);
    }

    /// Records a successful step.
    pub fn record(&mut self, step: u32, observation: Observation) {
        self.emit(step, EventStatus::Success, observation, None);
    }

    /// Records a failed step. Timeouts get their own status.
    pub fn record_error(&mut self, step: u32, observation: Observation, err: &ProbeError) {
        let status = if err.is_timeout() {
            EventStatus::Timeout
        } else {
            EventStatus::Failure
        };
        self.emit(step, status, observation, Some(err.into()));
    }

    /// Last event of a run whose probe gave up or crashed.
    pub(crate) fn record_fault(&mut self, err: &ProbeError) {
        let step = self.events.last().map(|event| event.step + 1).unwrap_or(1);
        let observation = Observation::Fault {
            message: err.to_string(),
        };
        self.emit(step, EventStatus::Failure, observation, Some(err.into()));
    }

    pub fn checkpoint(&self) -> Result<(), ProbeError> {
        if self.cancel.is_cancelled() {
            return Err(ProbeError::Cancelled);
        }
        Ok(())
    }

    /// Sleeps for `delay`, waking up early if the run gets cancelled.
    pub async fn pause(&self, delay: Duration) -> Result<(), ProbeError> {
        if delay.is_zero() {
            return self.checkpoint();
        }

        tokio::select! {
            _ = self.cancel.cancelled() => Err(ProbeError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }

    /// Resolves the run's target. An empty answer is already an error here.
    pub async fn resolve(&self, timeout: Duration) -> Result<Vec<IpAddr>, ProbeError> {
        self.checkpoint()?;
        let addrs = self.transport.resolve(&self.target, timeout).await?;
        if addrs.is_empty() {
            return Err(ProbeError::resolution(&self.target, "no addresses found"));
        }
        Ok(addrs)
    }

    pub async fn resolve_first(&self, timeout: Duration) -> Result<IpAddr, ProbeError> {
        let addrs = self.resolve(timeout).await?;
        addrs
            .first()
            .copied()
            .ok_or_else(|| ProbeError::resolution(&self.target, "no addresses found"))
    }
}

/// A scripted [`Transport`] / [`HttpClient`] pair for probe unit tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use netlens_common::transport::HttpReply;
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::sync::Mutex;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    #[derive(Default)]
    pub struct StubTransport {
        pub hosts: HashMap<String, Vec<IpAddr>>,
        pub names: HashMap<IpAddr, String>,
        /// Connect outcome per port; ports not listed are refused.
        pub ports: HashMap<u16, Result<Duration, ProbeError>>,
        /// Outcomes handed out in order by `reach`; the last one repeats.
        pub reach_script: Mutex<Vec<Result<Duration, ProbeError>>>,
    }

    impl StubTransport {
        pub fn with_host(host: &str, addrs: &[&str]) -> Self {
            let mut stub = Self::default();
            stub.hosts.insert(
                host.to_string(),
                addrs.iter().map(|a| a.parse().unwrap()).collect(),
            );
            stub
        }

        pub fn reach_always(self, outcome: Result<Duration, ProbeError>) -> Self {
            *self.reach_script.lock().unwrap() = vec![outcome];
            self
        }

        pub fn reach_sequence(self, outcomes: Vec<Result<Duration, ProbeError>>) -> Self {
            *self.reach_script.lock().unwrap() = outcomes;
            self
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn resolve(&self, host: &str, _t: Duration) -> Result<Vec<IpAddr>, ProbeError> {
            if let Ok(addr) = host.parse::<IpAddr>() {
                return Ok(vec![addr]);
            }
            self.hosts
                .get(host)
                .cloned()
                .ok_or_else(|| ProbeError::resolution(host, "no records found"))
        }

        async fn reverse(&self, addr: IpAddr, _t: Duration) -> Result<String, ProbeError> {
            self.names
                .get(&addr)
                .cloned()
                .ok_or_else(|| ProbeError::resolution(&addr.to_string(), "no PTR record"))
        }

        async fn connect(&self, addr: SocketAddr, _t: Duration) -> Result<Duration, ProbeError> {
            self.ports
                .get(&addr.port())
                .cloned()
                .unwrap_or(Err(ProbeError::ConnectionRefused { addr }))
        }

        async fn reach(&self, _addr: SocketAddr, _t: Duration) -> Result<Duration, ProbeError> {
            let mut script = self.reach_script.lock().unwrap();
            match script.len() {
                0 => Ok(Duration::from_micros(500)),
                1 => script[0].clone(),
                _ => script.remove(0),
            }
        }
    }

    #[derive(Default)]
    pub struct StubHttp {
        /// Status and body size per URL; unknown URLs time out.
        pub replies: HashMap<String, (u16, u64)>,
        pub posted: Mutex<Vec<usize>>,
    }

    impl StubHttp {
        pub fn reply(mut self, url: &str, status: u16, bytes: u64) -> Self {
            self.replies.insert(url.to_string(), (status, bytes));
            self
        }

        fn lookup(&self, url: &str, timeout: Duration) -> Result<HttpReply, ProbeError> {
            self.replies
                .get(url)
                .map(|(status, bytes)| HttpReply {
                    status: *status,
                    bytes: *bytes,
                })
                .ok_or(ProbeError::Timeout { after: timeout })
        }
    }

    #[async_trait]
    impl HttpClient for StubHttp {
        async fn get(&self, url: &str, timeout: Duration) -> Result<HttpReply, ProbeError> {
            self.lookup(url, timeout)
        }

        async fn post(
            &self,
            url: &str,
            body: Vec<u8>,
            timeout: Duration,
        ) -> Result<HttpReply, ProbeError> {
            self.posted.lock().unwrap().push(body.len());
            self.lookup(url, timeout)
        }

        async fn get_text(&self, url: &str, timeout: Duration) -> Result<String, ProbeError> {
            self.lookup(url, timeout).map(|_| String::new())
        }
    }

    pub fn context(
        target: &str,
        transport: StubTransport,
        http: StubHttp,
    ) -> (RunContext, UnboundedReceiver<RunUpdate>, CancellationToken) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let ctx = RunContext::new(
            RunHandle::new(1),
            target,
            tx,
            cancel.clone(),
            Arc::new(transport),
            Arc::new(http),
        );
        (ctx, rx, cancel)
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
    use super::testing::*;
    use super::*;

    #[tokio::test]
    async fn sequence_numbers_are_gapless() {
        let (mut ctx, mut rx, _cancel) =
            context("example.test", StubTransport::default(), StubHttp::default());

        ctx.record(1, Observation::Latency { latency: None });
        ctx.record_error(
            2,
            Observation::Latency { latency: None },
            &ProbeError::Timeout {
                after: Duration::from_secs(1),
            },
        );
        ctx.record_fault(&ProbeError::Internal("boom".into()));

        let seqs: Vec<u64> = ctx.events().iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(ctx.events()[1].status, EventStatus::Timeout);
        assert_eq!(ctx.events()[2].step, 3);

        for expected in 1..=3 {
            match rx.recv().await {
                Some(RunUpdate::Event(event)) => assert_eq!(event.seq, expected),
                other => panic!("unexpected update: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn pause_wakes_up_on_cancel() {
        let (ctx, _rx, cancel) =
            context("example.test", StubTransport::default(), StubHttp::default());
        cancel.cancel();

        let started = std::time::Instant::now();
        let result = ctx.pause(Duration::from_secs(30)).await;
        assert_eq!(result, Err(ProbeError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(ctx.checkpoint(), Err(ProbeError::Cancelled));
    }
}
