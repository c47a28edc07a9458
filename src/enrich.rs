// src/enrich.rs
//
// Optional, best-effort address enrichment: resolve a host back to a
// friendlier IPv4 display address via the kernel's neighbor table, falling
// back to EUI-64 MAC reconstruction for IPv6 link-local hosts that never
// show up directly in the table. Never fails a pass — a resolver that
// can't find a mapping just returns `None` and the raw host string is used
// for display.

use std::collections::HashMap;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

/// Resolves an observed host address to a friendlier display address.
/// Implementations must never block the caller on network I/O failures —
/// `None` is always a valid, non-fatal answer.
#[async_trait::async_trait]
pub trait NeighborResolver: Send + Sync {
    async fn resolve(&self, host: &str) -> Option<String>;
}

/// Always returns `None`. The default when enrichment is disabled or the
/// platform has no `ip neigh` equivalent.
pub struct NoopResolver;

#[async_trait::async_trait]
impl NeighborResolver for NoopResolver {
    async fn resolve(&self, _host: &str) -> Option<String> {
        None
    }
}

/// Shells out to `ip neigh show` to build `neigh_ip -> mac` and
/// `mac -> ipv4` maps, reconstructing the EUI-64 identifier when a host
/// only ever appears as a `fe80::` address and never directly as an entry
/// in the neighbor table.
pub struct IpNeighResolver;

#[async_trait::async_trait]
impl NeighborResolver for IpNeighResolver {
    async fn resolve(&self, host: &str) -> Option<String> {
        let table = query_neigh_table().await?;
        resolve_from_table(host, &table)
    }
}

struct NeighTable {
    /// observed neighbor address -> lower-cased MAC.
    ip_to_mac: HashMap<String, String>,
    /// lower-cased MAC -> IPv4 address.
    mac_to_ipv4: HashMap<String, String>,
}

async fn query_neigh_table() -> Option<NeighTable> {
    let output = Command::new("ip")
        .args(["neigh", "show"])
        .stdout(Stdio::piped())
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        debug!("`ip neigh show` exited non-zero, enrichment unavailable this pass");
        return None;
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let mut ip_to_mac = HashMap::new();
    let mut mac_to_ipv4 = HashMap::new();

    for line in text.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        // Typical line: "<ip> dev <iface> lladdr <mac> <state...>"
        let Some(ip) = fields.first() else { continue };
        let Some(lladdr_idx) = fields.iter().position(|&f| f == "lladdr") else {
            continue;
        };
        let Some(mac) = fields.get(lladdr_idx + 1) else {
            continue;
        };
        let mac = mac.to_lowercase();
        ip_to_mac.insert(ip.to_string(), mac.clone());
        if ip.parse::<std::net::Ipv4Addr>().is_ok() {
            mac_to_ipv4.insert(mac, ip.to_string());
        }
    }

    Some(NeighTable { ip_to_mac, mac_to_ipv4 })
}

/// Direct lookup first: if `host` is itself a neighbor-table entry whose
/// MAC resolves to an IPv4 address, use that. Otherwise, if `host` is an
/// IPv6 link-local address, reconstruct its EUI-64 MAC and look that up.
fn resolve_from_table(host: &str, table: &NeighTable) -> Option<String> {
    if let Some(mac) = table.ip_to_mac.get(host) {
        if let Some(ipv4) = table.mac_to_ipv4.get(mac) {
            return Some(ipv4.clone());
        }
    }

    let mac = eui64_to_mac(host)?;
    table.mac_to_ipv4.get(&mac).cloned()
}

/// Reconstruct a MAC address from an EUI-64 `fe80::` link-local address:
/// expand the interface identifier to 16 hex digits, strip the `fffe`
/// stuffing inserted between OUI and device id, then flip the universal/
/// local bit (XOR `0x02` into the first octet) back to its original value.
fn eui64_to_mac(addr: &str) -> Option<String> {
    let addr = addr.strip_prefix("fe80::")?;
    let expanded = expand_ipv6_tail(addr)?;
    if expanded.len() != 16 {
        return None;
    }
    if &expanded[6..10] != "fffe" {
        return None;
    }

    let mut bytes = Vec::with_capacity(6);
    for i in (0..16).step_by(2) {
        if (6..10).contains(&i) {
            continue;
        }
        bytes.push(u8::from_str_radix(&expanded[i..i + 2], 16).ok()?);
    }
    if bytes.len() != 6 {
        return None;
    }
    bytes[0] ^= 0x02;

    Some(
        bytes
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(":"),
    )
}

/// Expand the 4 hex groups after `fe80::` into a flat 16-hex-digit string,
/// zero-padding each group to 4 digits (no embedded `::` is expected here —
/// the interface identifier is always fully specified).
fn expand_ipv6_tail(tail: &str) -> Option<String> {
    let groups: Vec<&str> = tail.split(':').collect();
    if groups.len() != 4 {
        return None;
    }
    let mut out = String::with_capacity(16);
    for g in groups {
        if g.len() > 4 || !g.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        out.push_str(&"0".repeat(4 - g.len()));
        out.push_str(g);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconstructs_mac_from_eui64_address() {
        // 02:1a:2b:ff:fe:3c:4d:5e style padding, fffe stuffing at bytes 3-4.
        let mac = eui64_to_mac("fe80::21a:2bff:fe3c:4d5e").unwrap();
        assert_eq!(mac, "00:1a:2b:3c:4d:5e");
    }

    #[test]
    fn rejects_address_without_fffe_stuffing() {
        assert_eq!(eui64_to_mac("fe80::1234:5678:9abc:def0"), None);
    }

    #[test]
    fn rejects_non_link_local_address() {
        assert_eq!(eui64_to_mac("2001:db8::1"), None);
    }

    #[test]
    fn direct_neighbor_entry_resolves_without_eui64() {
        let mut ip_to_mac = HashMap::new();
        ip_to_mac.insert("2001:db8::1".to_string(), "aa:bb:cc:dd:ee:ff".to_string());
        let mut mac_to_ipv4 = HashMap::new();
        mac_to_ipv4.insert("aa:bb:cc:dd:ee:ff".to_string(), "192.168.1.50".to_string());
        let table = NeighTable { ip_to_mac, mac_to_ipv4 };

        assert_eq!(
            resolve_from_table("2001:db8::1", &table),
            Some("192.168.1.50".to_string())
        );
    }

    #[test]
    fn falls_back_to_eui64_when_not_a_direct_neighbor() {
        let mut mac_to_ipv4 = HashMap::new();
        mac_to_ipv4.insert("00:1a:2b:3c:4d:5e".to_string(), "10.0.0.9".to_string());
        let table = NeighTable {
            ip_to_mac: HashMap::new(),
            mac_to_ipv4,
        };

        assert_eq!(
            resolve_from_table("fe80::21a:2bff:fe3c:4d5e", &table),
            Some("10.0.0.9".to_string())
        );
    }

    #[tokio::test]
    async fn noop_resolver_always_returns_none() {
        let resolver = NoopResolver;
        assert_eq!(resolver.resolve("10.0.0.1").await, None);
    }
}
