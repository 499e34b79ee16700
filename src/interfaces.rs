//! Host network interface enumeration
//!
//! Provides the minimal interface snapshot the protocols need: an IPv4
//! address to bind and a broadcast address for discovery. Recomputed on
//! every call; nothing is cached.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

use crate::errors::{FlashError, Result};

/// Read-only snapshot of one host interface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInterfaceDescriptor {
    pub name: String,
    pub index: u32,
    /// Link-layer address, colon-hex, empty when unavailable
    pub mac: String,
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<std::net::Ipv6Addr>,
    /// Destination for discovery broadcasts
    pub ipv4_broadcast: Ipv4Addr,
}

impl NetworkInterfaceDescriptor {
    /// Whether this interface can carry a protocol exchange
    pub fn is_usable(&self) -> bool {
        self.ipv4.is_some()
    }
}

/// Enumerate host interfaces, one descriptor per interface name.
///
/// Multiple addresses on one interface collapse into a single descriptor,
/// keeping the first IPv4 and IPv6 seen.
pub fn enumerate() -> Result<Vec<NetworkInterfaceDescriptor>> {
    let addrs = if_addrs::get_if_addrs()
        .map_err(|e| FlashError::Interface(format!("interface enumeration failed: {}", e)))?;

    let mut result: Vec<NetworkInterfaceDescriptor> = Vec::new();
    for addr in addrs {
        let entry = match result.iter_mut().find(|d| d.name == addr.name) {
            Some(existing) => existing,
            None => {
                let index = addr.index.unwrap_or(result.len() as u32 + 1);
                result.push(NetworkInterfaceDescriptor {
                    name: addr.name.clone(),
                    index,
                    mac: mac_for(&addr.name).unwrap_or_default(),
                    ipv4: None,
                    ipv6: None,
                    // Boards answer the limited broadcast even before they
                    // hold a routable address
                    ipv4_broadcast: Ipv4Addr::BROADCAST,
                });
                result.last_mut().unwrap()
            }
        };

        match &addr.addr {
            if_addrs::IfAddr::V4(v4) => {
                if entry.ipv4.is_none() {
                    entry.ipv4 = Some(v4.ip);
                }
            }
            if_addrs::IfAddr::V6(v6) => {
                if entry.ipv6.is_none() {
                    entry.ipv6 = Some(v6.ip);
                }
            }
        }
    }

    Ok(result)
}

/// Look up an interface by its enumeration index
pub fn by_index(index: u32) -> Result<NetworkInterfaceDescriptor> {
    let descriptor = enumerate()?
        .into_iter()
        .find(|d| d.index == index)
        .ok_or_else(|| FlashError::Interface(format!("no interface with index {}", index)))?;
    if !descriptor.is_usable() {
        return Err(FlashError::Interface(format!(
            "interface {} ({}) has no IPv4 address",
            descriptor.index, descriptor.name
        )));
    }
    Ok(descriptor)
}

#[cfg(target_os = "linux")]
fn mac_for(name: &str) -> Option<String> {
    let raw = std::fs::read_to_string(format!("/sys/class/net/{}/address", name)).ok()?;
    let mac = raw.trim();
    if mac.is_empty() { None } else { Some(mac.to_string()) }
}

#[cfg(not(target_os = "linux"))]
fn mac_for(_name: &str) -> Option<String> {
    None
}
