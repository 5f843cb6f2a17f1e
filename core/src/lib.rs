//! # netlens core
//!
//! The diagnostics engine: five probes, the worker pool that runs them, and the
//! production network transports they are wired to by default.

pub mod engine;
pub mod network;
pub mod probe;

use std::sync::Arc;

use netlens_common::config::Config;

pub use engine::{Engine, EngineError, EventStream};

/// An engine wired to the system resolver, tokio sockets and a reqwest client.
pub fn system_engine(config: &Config) -> anyhow::Result<Engine> {
    let transport = Arc::new(network::transport::SystemTransport::new());
    let http = Arc::new(network::http::ReqwestClient::new()?);
    Ok(Engine::new(config, transport, http))
}
