//! Throughput and public address lookups against a minimal HTTP/1.1 server on
//! 127.0.0.1, through the real reqwest client.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use netlens_common::config::ThroughputConfig;
use netlens_common::error::ErrorKind;
use netlens_common::probe::event::{EventStatus, Observation, Stage};
use netlens_common::probe::request::{Direction, ProbeRequest};
use netlens_common::probe::result::{RunStatus, Summary};
use netlens_core::Engine;
use netlens_core::network::http::ReqwestClient;
use netlens_core::network::interface::public_ip;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::support::ScriptedTransport;

fn header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

fn route(path: &str) -> (u16, Vec<u8>) {
    if let Some(size) = path.strip_prefix("/bytes/") {
        (200, vec![0x5a; size.parse().unwrap_or(0)])
    } else {
        match path {
            "/get" | "/post" => (200, b"{}".to_vec()),
            "/ip" => (200, br#"{"origin": "203.0.113.7"}"#.to_vec()),
            _ => (404, Vec::new()),
        }
    }
}

async fn respond(mut stream: TcpStream) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 16 * 1024];

    let end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = header_end(&buf) {
            break end;
        }
    };

    let head = String::from_utf8_lossy(&buf[..end]).to_string();
    let body_len = content_length(&head);
    while buf.len() < end + body_len {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let path = head.split_whitespace().nth(1).unwrap_or("/");
    let (status, body) = route(path);
    let reason = if status == 200 { "OK" } else { "Not Found" };
    let header = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    stream.write_all(header.as_bytes()).await?;
    stream.write_all(&body).await?;
    stream.shutdown().await
}

async fn serve() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(respond(stream));
        }
    });
    addr
}

fn endpoints(addr: SocketAddr, download: &[&str]) -> ThroughputConfig {
    ThroughputConfig {
        latency_url: format!("http://{addr}/get"),
        download_urls: download.iter().map(|p| format!("http://{addr}{p}")).collect(),
        upload_url: format!("http://{addr}/post"),
        upload_bytes: 64 * 1024,
        latency_timeout_ms: 2000,
        transfer_timeout_ms: 5000,
    }
}

fn http_engine() -> Engine {
    Engine::with_workers(
        1,
        Arc::new(ScriptedTransport::default()),
        Arc::new(ReqwestClient::new().unwrap()),
    )
}

#[tokio::test]
async fn every_stage_runs_against_a_local_server() {
    let addr = serve().await;
    let config = endpoints(addr, &["/bytes/1024", "/bytes/2048", "/bytes/4096"]);
    let engine = http_engine();

    let run = engine
        .start(ProbeRequest::throughput(config.params(Direction::Both)))
        .unwrap();
    let result = engine.await_result(run).await.unwrap();

    assert_eq!(result.target, addr.to_string());
    assert_eq!(result.status, RunStatus::Completed, "{:?}", result.events);
    let downloaded = result.events.iter().find_map(|e| match e.observation {
        Observation::Throughput {
            stage: Stage::Download,
            bytes,
            ..
        } => Some(bytes),
        _ => None,
    });
    assert_eq!(downloaded, Some(7168));

    let Some(Summary::Throughput {
        latency,
        download_mbps,
        upload_mbps,
    }) = result.summary
    else {
        panic!("expected a throughput summary");
    };
    assert!(latency.is_some());
    assert!(download_mbps.is_some());
    assert!(upload_mbps.is_some());
    engine.shutdown().await;
}

#[tokio::test]
async fn missing_payloads_fail_the_download_stage_only() {
    let addr = serve().await;
    let config = endpoints(addr, &["/missing", "/gone"]);
    let engine = http_engine();

    let run = engine
        .start(ProbeRequest::throughput(config.params(Direction::Both)))
        .unwrap();
    let result = engine.await_result(run).await.unwrap();

    assert_eq!(result.status, RunStatus::PartiallyCompleted);
    let failed_sample = result
        .events
        .iter()
        .find(|e| matches!(e.observation, Observation::Sample { .. }) && !e.is_success())
        .expect("failed sample event");
    assert_eq!(failed_sample.status, EventStatus::Failure);
    assert_eq!(
        failed_sample.error.as_ref().map(|e| e.kind),
        Some(ErrorKind::Http)
    );

    let Some(Summary::Throughput {
        download_mbps,
        upload_mbps,
        ..
    }) = result.summary
    else {
        panic!("expected a throughput summary");
    };
    assert!(download_mbps.is_none());
    assert!(upload_mbps.is_some());
    engine.shutdown().await;
}

#[tokio::test]
async fn download_rate_covers_the_payloads_that_arrived() {
    let addr = serve().await;
    let config = endpoints(addr, &["/missing", "/bytes/1024", "/bytes/2048"]);
    let engine = http_engine();

    let run = engine
        .start(ProbeRequest::throughput(config.params(Direction::Download)))
        .unwrap();
    let result = engine.await_result(run).await.unwrap();

    assert_eq!(result.status, RunStatus::Completed);
    let samples = result
        .events
        .iter()
        .filter(|e| matches!(e.observation, Observation::Sample { .. }))
        .count();
    assert_eq!(samples, 3);

    let downloaded = result.events.iter().find_map(|e| match &e.observation {
        Observation::Throughput { bytes, .. } if e.is_success() => Some(*bytes),
        _ => None,
    });
    assert_eq!(downloaded, Some(1024 + 2048));
    engine.shutdown().await;
}

#[tokio::test]
async fn public_address_comes_from_the_first_answering_service() {
    let addr = serve().await;
    let dead = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = dead.local_addr().unwrap();
    drop(dead);

    let services = vec![
        format!("http://{dead_addr}/ip"),
        format!("http://{addr}/missing"),
        format!("http://{addr}/ip"),
    ];
    let client = ReqwestClient::new().unwrap();

    let found = public_ip(&client, &services, Duration::from_secs(2))
        .await
        .expect("an answering service");

    assert_eq!(found.addr, "203.0.113.7".parse::<std::net::IpAddr>().unwrap());
    assert_eq!(found.service, services[2]);
}
