use std::sync::mpsc;
use std::time::Duration;

use netlens_common::config::parse_config;
use netlens_common::error::ErrorKind;
use netlens_common::network::ports::PortSelection;
use netlens_common::probe::event::{EventStatus, Observation, PortState};
use netlens_common::probe::request::{
    DnsParams, Mode, PingParams, PortScanParams, ProbeRequest, TracerouteParams,
};
use netlens_common::probe::result::{RunStatus, Summary};
use netlens_common::probe::stats::QualityRating;
use netlens_common::sink::RunUpdate;

use crate::support::{ScriptedTransport, engine};

fn quick_ping(attempts: u32) -> PingParams {
    PingParams {
        attempts,
        interval: Duration::ZERO,
        ..PingParams::default()
    }
}

#[tokio::test]
async fn ping_to_a_fast_host_is_excellent() {
    let transport = ScriptedTransport::default()
        .host("fast.test", &["192.0.2.1"])
        .open(80, Duration::from_micros(300));
    let engine = engine(2, transport);

    let (run, stream) = engine
        .start_with_events(ProbeRequest::ping("fast.test", quick_ping(5)))
        .unwrap();
    let (events, result) = stream.collect().await;
    let result = result.expect("terminal result");

    assert_eq!(result.run, run);
    assert_eq!(events.len(), 5);
    assert!(events.iter().all(|e| e.status == EventStatus::Success));
    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.quality(), Some(QualityRating::Excellent));
    assert_eq!(
        result.summary.map(|s| s.to_string()).as_deref(),
        Some("5/5 successful, quality Excellent")
    );
    engine.shutdown().await;
}

#[tokio::test]
async fn scanning_a_refusing_host_finds_nothing_open() {
    let transport = ScriptedTransport::default().host("closed.test", &["192.0.2.2"]);
    let engine = engine(1, transport);
    let params = PortScanParams {
        ports: PortSelection::Common,
        delay: Duration::ZERO,
        ..PortScanParams::default()
    };

    let (_, stream) = engine
        .start_with_events(ProbeRequest::port_scan("closed.test", params))
        .unwrap();
    let (events, result) = stream.collect().await;
    let result = result.unwrap();

    assert_eq!(events.len(), 13);
    assert!(events.iter().all(|e| matches!(
        e.observation,
        Observation::Port {
            state: PortState::Closed,
            ..
        }
    )));
    assert_eq!(result.summary.unwrap().to_string(), "0/13 open");
    engine.shutdown().await;
}

#[tokio::test]
async fn unknown_domain_fails_with_a_single_event() {
    let engine = engine(1, ScriptedTransport::default());

    let (_, stream) = engine
        .start_with_events(ProbeRequest::dns(
            "nonexistent-domain-xyz.invalid",
            DnsParams::default(),
        ))
        .unwrap();
    let (events, result) = stream.collect().await;
    let result = result.unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, EventStatus::Failure);
    assert_eq!(
        events[0].error.as_ref().map(|e| e.kind),
        Some(ErrorKind::Resolution)
    );
    assert_eq!(result.status, RunStatus::Failed);
    assert!(result.quality().is_none());
    engine.shutdown().await;
}

#[tokio::test]
async fn unreachable_host_never_completes_a_trace() {
    let transport = ScriptedTransport::default()
        .host("far.test", &["203.0.113.1"])
        .unreachable();
    let engine = engine(1, transport);
    let params = TracerouteParams {
        delay: Duration::ZERO,
        ..TracerouteParams::for_mode(Mode::Batch)
    };

    let (_, stream) = engine
        .start_with_events(ProbeRequest::traceroute("far.test", params))
        .unwrap();
    let (events, result) = stream.collect().await;
    let result = result.unwrap();

    assert_eq!(events.len(), 5);
    assert!(events.iter().all(|e| e.status == EventStatus::Timeout));
    assert_eq!(result.status, RunStatus::PartiallyCompleted);
    assert!(matches!(
        result.summary,
        Some(Summary::Traceroute {
            reached: false,
            approximated: true,
            ..
        })
    ));
    engine.shutdown().await;
}

#[tokio::test]
async fn batch_runs_share_the_pool_and_stay_ordered() {
    let hosts = ["a.test", "b.test", "c.test", "d.test", "e.test"];
    let mut transport = ScriptedTransport::default()
        .open(80, Duration::from_millis(1))
        .slow(Duration::from_millis(5));
    for (i, host) in hosts.iter().enumerate() {
        let addr = format!("192.0.2.{}", 10 + i);
        transport = transport.host(host, &[addr.as_str()]);
    }
    let engine = engine(2, transport);

    let (tx, rx) = mpsc::channel::<RunUpdate>();
    let mut runs = Vec::new();
    for host in hosts {
        let run = engine.start(ProbeRequest::ping(host, quick_ping(3))).unwrap();
        engine.subscribe(run, tx.clone()).unwrap();
        runs.push(run);
    }
    drop(tx);

    for run in &runs {
        let result = engine.await_result(*run).await.unwrap();
        assert_eq!(result.status, RunStatus::Completed);
    }
    engine.shutdown().await;

    let updates: Vec<RunUpdate> = rx.try_iter().collect();
    for run in runs {
        let seqs: Vec<u64> = updates
            .iter()
            .filter_map(|u| match u {
                RunUpdate::Event(e) if e.run == run => Some(e.seq),
                _ => None,
            })
            .collect();
        assert_eq!(seqs.len(), 3);
        assert!(seqs.windows(2).all(|w| w[0] < w[1]), "{run}: {seqs:?}");

        let finished = updates
            .iter()
            .filter(|u| matches!(u, RunUpdate::Finished(r) if r.run == run))
            .count();
        assert_eq!(finished, 1);
    }
}

#[tokio::test]
async fn cancelling_stops_at_the_next_step() {
    let transport = ScriptedTransport::default()
        .host("slow.test", &["192.0.2.50"])
        .open(80, Duration::from_millis(1))
        .slow(Duration::from_millis(20));
    let engine = engine(1, transport);

    let (run, mut stream) = engine
        .start_with_events(ProbeRequest::ping("slow.test", quick_ping(200)))
        .unwrap();

    let first = stream.next().await;
    assert!(matches!(first, Some(RunUpdate::Event(_))));
    engine.cancel(run).unwrap();

    let (events, result) = stream.collect().await;
    let result = result.unwrap();

    assert_eq!(result.status, RunStatus::Cancelled);
    assert!(events.len() <= 1, "kept going after cancel: {}", events.len());
    assert_eq!(result.events.len(), events.len() + 1);
    engine.shutdown().await;
}

#[tokio::test]
async fn configuration_drives_engine_and_probe_defaults() {
    let config = parse_config(
        "workers: 1\nping:\n  attempts: 2\n  interval_ms: 0\n",
    )
    .unwrap();
    let transport = ScriptedTransport::default()
        .host("cfg.test", &["192.0.2.60"])
        .open(80, Duration::from_millis(2));
    let engine = netlens_core::Engine::new(
        &config,
        std::sync::Arc::new(transport),
        std::sync::Arc::new(crate::support::Offline),
    );

    let run = engine
        .start(ProbeRequest::ping("cfg.test", config.ping.params(Mode::Single)))
        .unwrap();
    let result = engine.await_result(run).await.unwrap();

    assert_eq!(result.events.len(), 2);
    assert_eq!(result.status, RunStatus::Completed);
    engine.shutdown().await;
}
