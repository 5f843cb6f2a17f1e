//! HTTP transfers for the throughput probe and public IP lookups.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use netlens_common::error::ProbeError;
use netlens_common::transport::{HttpClient, HttpReply};
use reqwest::{Client, Response};

const USER_AGENT: &str = concat!("netlens/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

fn classify(err: reqwest::Error, limit: Duration) -> ProbeError {
    if err.is_timeout() {
        ProbeError::Timeout { after: limit }
    } else if let Some(status) = err.status() {
        ProbeError::Http {
            status: status.as_u16(),
        }
    } else {
        ProbeError::Io(err.to_string())
    }
}

/// Streams the body to the end, counting bytes without keeping them.
async fn drain(mut response: Response, limit: Duration) -> Result<HttpReply, ProbeError> {
    let status = response.status().as_u16();
    let mut bytes: u64 = 0;
    while let Some(chunk) = response.chunk().await.map_err(|e| classify(e, limit))? {
        bytes += chunk.len() as u64;
    }
    Ok(HttpReply { status, bytes })
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpReply, ProbeError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;
        drain(response, timeout).await
    }

    async fn post(
        &self,
        url: &str,
        body: Vec<u8>,
        timeout: Duration,
    ) -> Result<HttpReply, ProbeError> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;
        drain(response, timeout).await
    }

    async fn get_text(&self, url: &str, timeout: Duration) -> Result<String, ProbeError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Http {
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(|e| classify(e, timeout))
    }
}
