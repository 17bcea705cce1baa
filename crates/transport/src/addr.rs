// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Self-URL detection and bind-host resolution.

use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};

pub const DEFAULT_BIND_PORT: u16 = 1235;
const LOOPBACK: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 1);

/// Resolve the bind host for a backbone server: prefer a routable,
/// non-loopback IPv4 address bound to this host's own name (stands in for
/// the overlay/tailnet IP in deployments that run one), falling back to
/// loopback when none is found.
pub fn detect_bind_host() -> IpAddr {
    detect_tailnet_ipv4().map(IpAddr::V4).unwrap_or(IpAddr::V4(LOOPBACK))
}

fn detect_tailnet_ipv4() -> Option<Ipv4Addr> {
    let hostname = hostname()?;
    let addrs = (hostname.as_str(), 0u16).to_socket_addrs().ok()?;
    addrs.filter_map(|a| match a.ip() {
        IpAddr::V4(v4) if !v4.is_loopback() => Some(v4),
        _ => None,
    }).next()
}

fn hostname() -> Option<String> {
    std::env::var("HOSTNAME").ok().filter(|h| !h.is_empty())
}

/// Is `host` this node, by name or by loopback/localhost alias?
pub fn is_self(host: &str, local_node_name: &str) -> bool {
    if host.eq_ignore_ascii_case(local_node_name) {
        return true;
    }
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

#[cfg(test)]
#[path = "addr_tests.rs"]
mod tests;
