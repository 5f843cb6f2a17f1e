//! # netlens common
//!
//! Shared vocabulary for the diagnostics engine: the request/event/result model,
//! the error taxonomy, configuration, and the traits that sit at the seams
//! between probes and the outside world ([`transport::Transport`],
//! [`transport::HttpClient`], [`sink::ResultSink`]).
//!
//! Nothing in here performs I/O on its own except [`config::load_config`].

pub mod config;
pub mod error;
pub mod log;
pub mod network;
pub mod probe;
pub mod sink;
pub mod transport;
