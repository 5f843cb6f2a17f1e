use crate::terminal::{colors, print};
use colored::*;
use netlens_common::network::address::get_ipv6_type;
use netlens_core::network::interface::{InterfaceKind, InterfaceSummary};
use pnet::ipnetwork::IpNetwork;

pub fn to_key_value_pair_net(ip_net: &[IpNetwork]) -> Vec<(String, ColoredString)> {
    ip_net
        .iter()
        .map(|ip_network| match ip_network {
            IpNetwork::V4(ipv4_network) => {
                let address: ColoredString = ipv4_network.ip().to_string().color(colors::IPV4_ADDR);
                let prefix: ColoredString =
                    ipv4_network.prefix().to_string().color(colors::IPV4_PREFIX);
                let result: ColoredString = format!("{address}/{prefix}").color(colors::SEPARATOR);
                ("IPv4".to_string(), result)
            }
            IpNetwork::V6(ipv6_network) => {
                let address: ColoredString = ipv6_network.ip().to_string().color(colors::IPV6_ADDR);
                let prefix: ColoredString =
                    ipv6_network.prefix().to_string().color(colors::IPV6_PREFIX);
                let value: ColoredString = format!("{address}/{prefix}").color(colors::SEPARATOR);
                let key = get_ipv6_type(&ipv6_network.ip()).label();
                (key.to_string(), value)
            }
        })
        .collect()
}

fn kind_label(kind: InterfaceKind) -> &'static str {
    match kind {
        InterfaceKind::Wired => "wired",
        InterfaceKind::Wireless => "wireless",
        InterfaceKind::Virtual => "virtual",
    }
}

pub fn print_interface(interface: &InterfaceSummary, idx: usize) {
    print::tree_head(idx, &interface.name);
    let mut key_value_pair: Vec<(String, ColoredString)> = vec![(
        "Type".to_string(),
        kind_label(interface.kind).color(colors::SECONDARY),
    )];
    key_value_pair.extend(to_key_value_pair_net(&interface.ips));
    if let Some(mac_addr) = interface.mac {
        key_value_pair.push((
            "MAC".to_string(),
            mac_addr.to_string().color(colors::MAC_ADDR),
        ));
    }
    print::as_tree_one_level(key_value_pair);
}
