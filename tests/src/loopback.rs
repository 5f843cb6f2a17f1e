//! The real tokio transport against listeners on 127.0.0.1.

use std::sync::Arc;
use std::time::Duration;

use netlens_common::network::ports::PortSelection;
use netlens_common::probe::event::{EventStatus, Observation, PortState};
use netlens_common::probe::request::{PingParams, PortScanParams, ProbeRequest};
use netlens_common::probe::result::{RunStatus, Summary};
use netlens_common::probe::stats::QualityRating;
use netlens_core::Engine;
use netlens_core::network::transport::SystemTransport;
use tokio::net::TcpListener;

use crate::support::Offline;

async fn listening_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            drop(stream);
        }
    });
    port
}

async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

fn system_engine() -> Engine {
    Engine::with_workers(2, Arc::new(SystemTransport::new()), Arc::new(Offline))
}

#[tokio::test]
async fn scan_finds_the_listening_port() {
    let open = listening_port().await;
    let engine = system_engine();
    let params = PortScanParams {
        ports: PortSelection::range(open, open).unwrap(),
        delay: Duration::ZERO,
        timeout: Duration::from_secs(1),
    };

    let run = engine
        .start(ProbeRequest::port_scan("127.0.0.1", params))
        .unwrap();
    let result = engine.await_result(run).await.unwrap();

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.events.len(), 1);
    assert!(matches!(
        result.events[0].observation,
        Observation::Port {
            state: PortState::Open,
            latency: Some(_),
            ..
        }
    ));
    let Some(Summary::PortScan { open: found, .. }) = &result.summary else {
        panic!("expected a port scan summary");
    };
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].port, open);
    engine.shutdown().await;
}

#[tokio::test]
async fn ping_over_loopback_is_excellent() {
    let port = listening_port().await;
    let engine = system_engine();
    let params = PingParams {
        attempts: 3,
        interval: Duration::ZERO,
        port,
        ..PingParams::default()
    };

    let run = engine.start(ProbeRequest::ping("127.0.0.1", params)).unwrap();
    let result = engine.await_result(run).await.unwrap();

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.quality(), Some(QualityRating::Excellent));
    engine.shutdown().await;
}

#[tokio::test]
async fn refused_connection_still_counts_as_reachable() {
    let port = closed_port().await;
    let engine = system_engine();
    let params = PingParams {
        attempts: 2,
        interval: Duration::ZERO,
        port,
        ..PingParams::default()
    };

    let run = engine.start(ProbeRequest::ping("127.0.0.1", params)).unwrap();
    let result = engine.await_result(run).await.unwrap();

    assert!(result.events.iter().all(|e| e.status == EventStatus::Success));
    assert_eq!(result.status, RunStatus::Completed);
    engine.shutdown().await;
}
