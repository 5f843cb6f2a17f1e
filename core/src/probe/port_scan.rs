//! TCP connect scan over the common service table or an explicit range.

use std::net::SocketAddr;

use async_trait::async_trait;
use netlens_common::error::ProbeError;
use netlens_common::network::ports::service_name;
use netlens_common::probe::event::{Observation, PortState};
use netlens_common::probe::request::PortScanParams;
use netlens_common::probe::result::{OpenPort, ProbeOutcome, RunStatus, Summary};

use super::{Probe, RunContext};

pub struct PortScanProbe {
    params: PortScanParams,
}

impl PortScanProbe {
    pub fn new(params: PortScanParams) -> Self {
        Self { params }
    }
}

#[async_trait]
impl Probe for PortScanProbe {
    async fn run(&self, ctx: &mut RunContext) -> Result<ProbeOutcome, ProbeError> {
        let ip = ctx.resolve_first(self.params.timeout).await?;
        let ports = self.params.ports.ports();
        let last = ports.len();

        let mut open: Vec<OpenPort> = Vec::new();
        let mut closed = 0;

        for (index, port) in ports.iter().copied().enumerate() {
            ctx.checkpoint()?;
            let step = index as u32 + 1;
            let service = service_name(port);

            match ctx
                .transport()
                .connect(SocketAddr::new(ip, port), self.params.timeout)
                .await
            {
                Ok(latency) => {
                    open.push(OpenPort { port, service });
                    ctx.record(
                        step,
                        Observation::Port {
                            port,
                            service,
                            state: PortState::Open,
                            latency: Some(latency),
                        },
                    );
                }
                Err(e) => {
                    closed += 1;
                    ctx.record_error(
                        step,
                        Observation::Port {
                            port,
                            service,
                            state: PortState::Closed,
                            latency: None,
                        },
                        &e,
                    );
                }
            }

            if index + 1 < last {
                ctx.pause(self.params.delay).await?;
            }
        }

        Ok(ProbeOutcome::new(
            RunStatus::Completed,
            Summary::PortScan {
                scanned: ports.len(),
                open,
                closed,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::testing::*;
    use netlens_common::error::ErrorKind;
    use netlens_common::network::ports::PortSelection;
    use netlens_common::probe::event::EventStatus;
    use std::time::Duration;

    fn params(ports: PortSelection) -> PortScanParams {
        PortScanParams {
            ports,
            delay: Duration::ZERO,
            ..PortScanParams::default()
        }
    }

    #[tokio::test]
    async fn refusing_host_has_every_common_port_closed() {
        let transport = StubTransport::with_host("closed.test", &["192.0.2.30"]);
        let (mut ctx, _rx, _cancel) = context("closed.test", transport, StubHttp::default());

        let outcome = PortScanProbe::new(params(PortSelection::Common))
            .run(&mut ctx)
            .await
            .unwrap();

        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.summary.to_string(), "0/13 open");
        assert_eq!(ctx.events().len(), 13);
        for event in ctx.events() {
            assert_eq!(event.status, EventStatus::Failure);
            assert_eq!(
                event.error.as_ref().map(|e| e.kind),
                Some(ErrorKind::ConnectionRefused)
            );
            assert!(matches!(
                event.observation,
                Observation::Port {
                    state: PortState::Closed,
                    ..
                }
            ));
        }
    }

    #[tokio::test]
    async fn open_ports_are_named_and_timeouts_are_closed() {
        let mut transport = StubTransport::with_host("web.test", &["192.0.2.31"]);
        transport.ports.insert(80, Ok(Duration::from_millis(3)));
        transport.ports.insert(
            81,
            Err(ProbeError::Timeout {
                after: Duration::from_secs(2),
            }),
        );
        let (mut ctx, _rx, _cancel) = context("web.test", transport, StubHttp::default());

        let outcome = PortScanProbe::new(params(PortSelection::range(80, 90).unwrap()))
            .run(&mut ctx)
            .await
            .unwrap();

        assert_eq!(
            outcome.summary,
            Summary::PortScan {
                scanned: 11,
                open: vec![OpenPort {
                    port: 80,
                    service: Some("HTTP"),
                }],
                closed: 10,
            }
        );
        assert_eq!(ctx.events()[0].status, EventStatus::Success);
        assert_eq!(ctx.events()[1].status, EventStatus::Timeout);
        let steps: Vec<u32> = ctx.events().iter().map(|e| e.step).collect();
        assert_eq!(steps, (1..=11).collect::<Vec<u32>>());
    }
}
