#![cfg(test)]

mod engine;
mod http;
mod loopback;
mod support;
