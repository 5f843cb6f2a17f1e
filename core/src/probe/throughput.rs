//! Throughput probe.
//!
//! Runs up to three stages in order, each concluding with its own event:
//! * **Latency**: one bounded GET against the reference endpoint.
//! * **Download**: the payload endpoints fetched one after another, one `Sample`
//!   per endpoint, then the aggregate rate over the samples that succeeded. The
//!   stage fails only when no sample did.
//! * **Upload**: one POST of a generated payload.
//!
//! A failed stage never prevents the next one from running.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use netlens_common::error::ProbeError;
use netlens_common::probe::event::{Observation, Stage};
use netlens_common::probe::request::ThroughputParams;
use netlens_common::probe::result::{ProbeOutcome, RunStatus, Summary};
use netlens_common::probe::stats::mbps;
use netlens_common::transport::HttpReply;

use super::{Probe, RunContext};

pub struct ThroughputProbe {
    params: ThroughputParams,
}

/// `byte[i] = i % 256`.
pub fn upload_payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 256) as u8).collect()
}

fn ensure_success(reply: HttpReply) -> Result<HttpReply, ProbeError> {
    if reply.is_success() {
        Ok(reply)
    } else {
        Err(ProbeError::Http {
            status: reply.status,
        })
    }
}

impl ThroughputProbe {
    pub fn new(params: ThroughputParams) -> Self {
        Self { params }
    }

    async fn latency(&self, ctx: &mut RunContext, step: u32) -> Result<Option<Duration>, ProbeError> {
        ctx.checkpoint()?;
        let started = Instant::now();
        let reply = ctx
            .http()
            .get(&self.params.latency_url, self.params.latency_timeout)
            .await
            .and_then(ensure_success);

        match reply {
            Ok(_) => {
                let latency = started.elapsed();
                ctx.record(
                    step,
                    Observation::Latency {
                        latency: Some(latency),
                    },
                );
                Ok(Some(latency))
            }
            Err(e) => {
                ctx.record_error(step, Observation::Latency { latency: None }, &e);
                Ok(None)
            }
        }
    }

    /// Returns the aggregate rate over the samples that succeeded, or `None`
    /// when none did.
    async fn download(&self, ctx: &mut RunContext, step: &mut u32) -> Result<Option<f64>, ProbeError> {
        let mut total_bytes: u64 = 0;
        let mut total_elapsed = Duration::ZERO;
        let mut succeeded = 0usize;
        let mut last_error: Option<ProbeError> = None;

        for url in &self.params.download_urls {
            ctx.checkpoint()?;
            *step += 1;

            let started = Instant::now();
            let reply = ctx
                .http()
                .get(url, self.params.transfer_timeout)
                .await
                .and_then(ensure_success);
            let elapsed = started.elapsed();

            match reply {
                Ok(reply) => {
                    succeeded += 1;
                    total_bytes += reply.bytes;
                    total_elapsed += elapsed;
                    ctx.record(
                        *step,
                        Observation::Sample {
                            url: url.clone(),
                            bytes: reply.bytes,
                            elapsed,
                        },
                    );
                }
                Err(e) => {
                    ctx.record_error(
                        *step,
                        Observation::Sample {
                            url: url.clone(),
                            bytes: 0,
                            elapsed,
                        },
                        &e,
                    );
                    last_error = Some(e);
                }
            }
        }

        *step += 1;
        if succeeded > 0 {
            let rate = mbps(total_bytes, total_elapsed);
            ctx.record(
                *step,
                Observation::Throughput {
                    stage: Stage::Download,
                    bytes: total_bytes,
                    elapsed: total_elapsed,
                    mbps: rate,
                },
            );
            return Ok(Some(rate));
        }

        let err = last_error.unwrap_or_else(|| {
            ProbeError::InvalidRequest("no download endpoints configured".to_string())
        });
        ctx.record_error(
            *step,
            Observation::Throughput {
                stage: Stage::Download,
                bytes: 0,
                elapsed: total_elapsed,
                mbps: 0.0,
            },
            &err,
        );
        Ok(None)
    }

    async fn upload(&self, ctx: &mut RunContext, step: u32) -> Result<Option<f64>, ProbeError> {
        ctx.checkpoint()?;
        let payload = upload_payload(self.params.upload_bytes);
        let bytes = payload.len() as u64;

        let started = Instant::now();
        let reply = ctx
            .http()
            .post(&self.params.upload_url, payload, self.params.transfer_timeout)
            .await
            .and_then(ensure_success);
        let elapsed = started.elapsed();

        match reply {
            Ok(_) => {
                let rate = mbps(bytes, elapsed);
                ctx.record(
                    step,
                    Observation::Throughput {
                        stage: Stage::Upload,
                        bytes,
                        elapsed,
                        mbps: rate,
                    },
                );
                Ok(Some(rate))
            }
            Err(e) => {
                ctx.record_error(
                    step,
                    Observation::Throughput {
                        stage: Stage::Upload,
                        bytes: 0,
                        elapsed,
                        mbps: 0.0,
                    },
                    &e,
                );
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl Probe for ThroughputProbe {
    async fn run(&self, ctx: &mut RunContext) -> Result<ProbeOutcome, ProbeError> {
        let mut step: u32 = 1;
        let mut attempted = 1;

        let latency = self.latency(ctx, step).await?;
        let mut succeeded = usize::from(latency.is_some());

        let mut download_mbps = None;
        if self.params.direction.includes_download() {
            attempted += 1;
            download_mbps = self.download(ctx, &mut step).await?;
            succeeded += usize::from(download_mbps.is_some());
        }

        let mut upload_mbps = None;
        if self.params.direction.includes_upload() {
            attempted += 1;
            step += 1;
            upload_mbps = self.upload(ctx, step).await?;
            succeeded += usize::from(upload_mbps.is_some());
        }

        Ok(ProbeOutcome::new(
            RunStatus::from_steps(succeeded, attempted),
            Summary::Throughput {
                latency,
                download_mbps,
                upload_mbps,
            },
        ))
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
