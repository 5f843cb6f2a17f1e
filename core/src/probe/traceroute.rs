//! Approximated traceroute.
//!
//! Intermediate routers are never identified: each "hop" is one more timed
//! reachability check against the final target. The destination counts as reached
//! at the first successful check once the hop counter has passed the configured
//! threshold. Summaries are always flagged as approximated.

use std::net::SocketAddr;

use async_trait::async_trait;
use netlens_common::error::ProbeError;
use netlens_common::probe::event::Observation;
use netlens_common::probe::request::TracerouteParams;
use netlens_common::probe::result::{ProbeOutcome, RunStatus, Summary};

use super::{Probe, RunContext};

pub struct TracerouteProbe {
    params: TracerouteParams,
}

impl TracerouteProbe {
    pub fn new(params: TracerouteParams) -> Self {
        Self { params }
    }
}

#[async_trait]
impl Probe for TracerouteProbe {
    async fn run(&self, ctx: &mut RunContext) -> Result<ProbeOutcome, ProbeError> {
        let TracerouteParams {
            max_hops,
            reach_threshold,
            hop_timeout,
            delay,
            port,
        } = self.params;

        let addr = SocketAddr::new(ctx.resolve_first(hop_timeout).await?, port);

        for hop in 1..=max_hops {
            ctx.checkpoint()?;

            match ctx.transport().reach(addr, hop_timeout).await {
                Ok(latency) => {
                    let reached = hop >= reach_threshold;
                    ctx.record(
                        hop,
                        Observation::Hop {
                            hop,
                            latency: Some(latency),
                            reached,
                        },
                    );
                    if reached {
                        return Ok(ProbeOutcome::new(
                            RunStatus::Completed,
                            Summary::Traceroute {
                                hops: hop,
                                reached: true,
                                approximated: true,
                            },
                        ));
                    }
                }
                Err(e) => ctx.record_error(
                    hop,
                    Observation::Hop {
                        hop,
                        latency: None,
                        reached: false,
                    },
                    &e,
                ),
            }

            if hop < max_hops {
                ctx.pause(delay).await?;
            }
        }

        Ok(ProbeOutcome::new(
            RunStatus::PartiallyCompleted,
            Summary::Traceroute {
                hops: max_hops,
                reached: false,
                approximated: true,
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
