//! Network address reconfiguration
//!
//! One packet tells a board to adopt a new IPv4 address, or to revert to
//! DHCP when the sentinel address is given. The board sends no
//! acknowledgment; the caller confirms the change with a rediscovery after
//! a settling delay it owns.

use std::net::{IpAddr, Ipv4Addr};

use crate::errors::{FlashError, Result};
use crate::interfaces::NetworkInterfaceDescriptor;
use crate::models::{BoardDescriptor, SetAddressResult};
use crate::protocol::{DebugDump, packet, transport::UdpTransport};

/// Whether `ip` is one of the revert-to-DHCP sentinel addresses
pub fn is_dhcp_sentinel(ip: Ipv4Addr) -> bool {
    ip == Ipv4Addr::UNSPECIFIED || ip == Ipv4Addr::BROADCAST
}

/// Fire-and-forget: send one set-address packet to the board's currently
/// known address.
pub fn set_address(
    interface: &NetworkInterfaceDescriptor,
    board: &BoardDescriptor,
    new_ip: Ipv4Addr,
    dump: DebugDump,
) -> Result<SetAddressResult> {
    let local = interface
        .ipv4
        .map(IpAddr::V4)
        .ok_or_else(|| {
            FlashError::Interface(format!("interface {} has no IPv4 address", interface.name))
        })?;

    // No receive happens here; the timeout only bounds the (unused) socket
    let transport = UdpTransport::bind(local, std::time::Duration::from_secs(1))?;

    let request = packet::encode_set_address(&board.mac, new_ip);
    packet::dump("set-address", &request, dump);

    let dhcp = is_dhcp_sentinel(new_ip);
    if dhcp {
        log::info!(
            "Set address: {} ({}) -> DHCP",
            board.mac_address,
            board.board_address
        );
    } else {
        log::info!(
            "Set address: {} ({}) -> {}",
            board.mac_address,
            board.board_address,
            new_ip
        );
    }

    transport.send(board.board_address, &request)?;

    Ok(SetAddressResult {
        old_address: board.board_address.to_string(),
        new_address: if dhcp {
            "DHCP".to_string()
        } else {
            new_ip.to_string()
        },
        mac_address: board.mac_address.clone(),
        message: "Setting new IP address".to_string(),
    })
}
