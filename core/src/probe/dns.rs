//! DNS probe.
//!
//! **Forward:** every resolved address is reported with its family, then checked
//! for reachability, then the first address is reverse-resolved for its canonical
//! name. **Reverse:** metadata for one address, no sub-checks.

use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use netlens_common::error::ProbeError;
use netlens_common::network::address::{AddressClass, IpFamily};
use netlens_common::probe::event::Observation;
use netlens_common::probe::request::{DnsMode, DnsParams};
use netlens_common::probe::result::{ProbeOutcome, RunStatus, Summary};
use tracing::debug;

use super::{Probe, RunContext};

pub struct DnsProbe {
    params: DnsParams,
}

impl DnsProbe {
    pub fn new(params: DnsParams) -> Self {
        Self { params }
    }

    async fn forward(&self, ctx: &mut RunContext) -> Result<ProbeOutcome, ProbeError> {
        let addrs = ctx.resolve(self.params.resolve_timeout).await?;
        let mut step: u32 = 0;

        for addr in &addrs {
            step += 1;
            ctx.record(
                step,
                Observation::Address {
                    addr: *addr,
                    family: IpFamily::of(addr),
                },
            );
        }

        let mut reachable = 0;
        for addr in &addrs {
            ctx.checkpoint()?;
            step += 1;

            let socket = SocketAddr::new(*addr, self.params.port);
            match ctx.transport().reach(socket, self.params.reach_timeout).await {
                Ok(latency) => {
                    reachable += 1;
                    ctx.record(
                        step,
                        Observation::Reachability {
                            addr: *addr,
                            latency: Some(latency),
                        },
                    );
                }
                Err(e) => ctx.record_error(
                    step,
                    Observation::Reachability {
                        addr: *addr,
                        latency: None,
                    },
                    &e,
                ),
            }
        }

        ctx.checkpoint()?;
        step += 1;
        let Some(&first) = addrs.first() else {
            return Err(ProbeError::resolution(ctx.target(), "no addresses found"));
        };
        let canonical = self.canonical_name(ctx, first).await;
        let hostname = ctx.target().to_string();
        ctx.record(
            step,
            Observation::Hostname {
                addr: first,
                hostname,
                canonical: canonical.clone(),
                class: AddressClass::of(&first),
            },
        );

        let status = if reachable == addrs.len() {
            RunStatus::Completed
        } else {
            RunStatus::PartiallyCompleted
        };

        Ok(ProbeOutcome::new(
            status,
            Summary::Dns {
                mode: DnsMode::Forward,
                addresses: addrs,
                canonical_name: Some(canonical),
            },
        ))
    }

    /// PTR name of `addr`, or its literal form when there is none.
    async fn canonical_name(&self, ctx: &RunContext, addr: IpAddr) -> String {
        match ctx
            .transport()
            .reverse(addr, self.params.resolve_timeout)
            .await
        {
            Ok(name) => name,
            Err(e) => {
                debug!("No canonical name for {addr}: {e}");
                addr.to_string()
            }
        }
    }

    async fn reverse(&self, ctx: &mut RunContext) -> Result<ProbeOutcome, ProbeError> {
        let addr = ctx.resolve_first(self.params.resolve_timeout).await?;
        ctx.checkpoint()?;

        let hostname = self.canonical_name(ctx, addr).await;

        ctx.record(
            1,
            Observation::Hostname {
                addr,
                hostname: hostname.clone(),
                canonical: hostname.clone(),
                class: AddressClass::of(&addr),
            },
        );

        Ok(ProbeOutcome::new(
            RunStatus::Completed,
            Summary::Dns {
                mode: DnsMode::Reverse,
                addresses: vec![addr],
                canonical_name: Some(hostname),
            },
        ))
    }
}

#[async_trait]
impl Probe for DnsProbe {
    async fn run(&self, ctx: &mut RunContext) -> Result<ProbeOutcome, ProbeError> {
        match self.params.mode {
            DnsMode::Forward => self.forward(ctx).await,
            DnsMode::Reverse => self.reverse(ctx).await,
        }
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
