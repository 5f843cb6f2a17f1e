//! Latency probe: a fixed number of timed reachability checks against one host.

use std::net::SocketAddr;

use async_trait::async_trait;
use netlens_common::error::ProbeError;
use netlens_common::probe::event::Observation;
use netlens_common::probe::request::PingParams;
use netlens_common::probe::result::{ProbeOutcome, RunStatus, Summary};
use netlens_common::probe::stats::AggregateStatistics;

use super::{Probe, RunContext};

pub struct PingProbe {
    params: PingParams,
}

impl PingProbe {
    pub fn new(params: PingParams) -> Self {
        Self { params }
    }
}

#[async_trait]
impl Probe for PingProbe {
    async fn run(&self, ctx: &mut RunContext) -> Result<ProbeOutcome, ProbeError> {
        let PingParams {
            attempts,
            timeout,
            interval,
            port,
        } = self.params;

        let addr = SocketAddr::new(ctx.resolve_first(timeout).await?, port);
        let mut successes: u32 = 0;

        for attempt in 1..=attempts {
            ctx.checkpoint()?;

            match ctx.transport().reach(addr, timeout).await {
                Ok(latency) => {
                    successes += 1;
                    ctx.record(
                        attempt,
                        Observation::PingAttempt {
                            attempt,
                            latency: Some(latency),
                        },
                    );
                }
                Err(e) => ctx.record_error(
                    attempt,
                    Observation::PingAttempt {
                        attempt,
                        latency: None,
                    },
                    &e,
                ),
            }

            if attempt < attempts {
                ctx.pause(interval).await?;
            }
        }

        let quality = AggregateStatistics::from_events(ctx.events()).quality();
        let status = RunStatus::from_steps(successes as usize, attempts as usize);

        Ok(ProbeOutcome::new(
            status,
            Summary::Ping {
                attempts,
                successes,
                quality,
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
