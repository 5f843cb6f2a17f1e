use netlens_common::config::Config;
use netlens_common::warn;
use netlens_core::network::http::ReqwestClient;
use netlens_core::network::interface::{self, InterfaceSummary};
use tracing::Instrument;

use crate::mprint;
use crate::terminal::spinner::Progress;
use crate::terminal::{network_fmt, print};

pub async fn info(config: &Config) -> anyhow::Result<()> {
    print::header("network interfaces");
    let interfaces: Vec<InterfaceSummary> = interface::list_interfaces();
    if interfaces.is_empty() {
        print::no_results("active interfaces");
    }
    for (idx, summary) in interfaces.iter().enumerate() {
        network_fmt::print_interface(summary, idx);
        if idx + 1 != interfaces.len() {
            mprint!();
        }
    }

    mprint!();
    print::header("addresses");
    print::set_key_width("Public IP".len());

    match interface::local_ip() {
        Some(ip) => print::aligned_line("Local IP", ip.to_string()),
        None => print::aligned_line("Local IP", "unknown"),
    }

    let http = ReqwestClient::new()?;
    let progress = Progress::start("Looking up public address", false);
    let public = interface::public_ip(
        &http,
        &config.public_ip_services,
        config.public_ip_timeout(),
    )
    .instrument(progress.span())
    .await;

    match public {
        Some(public) => {
            print::aligned_line("Public IP", public.addr.to_string());
            print::aligned_line("Source", public.service);
        }
        None => warn!("No public IP service answered"),
    }

    print::end_of_program();
    Ok(())
}
