//! Real implementations of the network seams.

pub mod http;
pub mod interface;
pub mod resolver;
pub mod tcp;
pub mod transport;
