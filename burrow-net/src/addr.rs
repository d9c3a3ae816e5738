use std::net::{Ipv4Addr, Ipv6Addr};

use crate::socks::SocksAddress;

/// Classify a host string as an IPv4 literal, an IPv6 literal, or a domain
/// name, yielding network-order bytes for the literal forms.
pub fn classify_host(host: &str) -> SocksAddress {
    if let Ok(ip) = host.parse::<Ipv4Addr>() {
        return SocksAddress::IpV4(ip.octets());
    }
    if let Ok(ip) = host.parse::<Ipv6Addr>() {
        return SocksAddress::IpV6(ip.octets());
    }
    SocksAddress::Domain(host.to_string())
}
