//! Board discovery
//!
//! A discovery broadcast goes out on the subnet and any protocol-2 board
//! answers with a 60-byte reply describing itself. `discover` returns the
//! first board to answer; `discover_all` keeps collecting replies for a
//! bounded window so multi-board subnets are captured in one call.

use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use crate::CONTROL_PORT;
use crate::errors::{FlashError, Result};
use crate::interfaces::NetworkInterfaceDescriptor;
use crate::models::BoardDescriptor;
use crate::protocol::{DebugDump, RetryPolicy, packet, transport::UdpTransport};

fn local_ip(interface: &NetworkInterfaceDescriptor) -> Result<IpAddr> {
    interface
        .ipv4
        .map(IpAddr::V4)
        .ok_or_else(|| {
            FlashError::Interface(format!("interface {} has no IPv4 address", interface.name))
        })
}

fn broadcast_dest(interface: &NetworkInterfaceDescriptor) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(interface.ipv4_broadcast), CONTROL_PORT)
}

/// Broadcast a discovery packet and return the first board that answers.
///
/// The broadcast is retransmitted up to the policy bound when no reply
/// arrives within the receive deadline.
pub fn discover(
    interface: &NetworkInterfaceDescriptor,
    policy: &RetryPolicy,
    dump: DebugDump,
) -> Result<BoardDescriptor> {
    let transport = UdpTransport::bind(local_ip(interface)?, policy.receive_timeout)?;
    transport.enable_broadcast()?;
    let dest = broadcast_dest(interface);
    let pc_address = transport.local_addr()?.to_string();
    let request = packet::encode_discover();
    packet::dump("discover", &request, dump);

    log::info!("Discover: {} -> {}", pc_address, dest);

    let mut last_timeout = None;
    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            log::debug!("discovery retransmit {}/{}", attempt, policy.max_retries);
        }
        transport.send(dest, &request)?;

        match transport.recv() {
            Ok((source, reply)) => {
                packet::dump("discovery reply", &reply, dump);
                return packet::parse_discovery_reply(&reply, &pc_address, source);
            }
            Err(FlashError::Timeout(msg)) => {
                last_timeout = Some(msg);
                continue;
            }
            Err(e) => return Err(e),
        }
    }

    Err(FlashError::Timeout(format!(
        "no discovery reply after {} attempts: {}",
        policy.max_retries + 1,
        last_timeout.unwrap_or_default()
    )))
}

/// Broadcast a discovery packet and collect every board answering within
/// `window`, deduplicated by MAC. An empty subnet returns an empty list,
/// not an error.
pub fn discover_all(
    interface: &NetworkInterfaceDescriptor,
    window: Duration,
    dump: DebugDump,
) -> Result<Vec<BoardDescriptor>> {
    // Short per-read deadline so the window deadline is honored closely
    let read_slice = Duration::from_millis(200).min(window);
    let transport = UdpTransport::bind(local_ip(interface)?, read_slice)?;
    transport.enable_broadcast()?;
    let dest = broadcast_dest(interface);
    let pc_address = transport.local_addr()?.to_string();
    let request = packet::encode_discover();
    packet::dump("discover", &request, dump);

    log::info!(
        "Discover (window {} ms): {} -> {}",
        window.as_millis(),
        pc_address,
        dest
    );

    transport.send(dest, &request)?;

    let deadline = Instant::now() + window;
    let mut boards: Vec<BoardDescriptor> = Vec::new();
    while Instant::now() < deadline {
        match transport.recv() {
            Ok((source, reply)) => {
                packet::dump("discovery reply", &reply, dump);
                match packet::parse_discovery_reply(&reply, &pc_address, source) {
                    Ok(board) => {
                        if boards.iter().all(|b| b.mac != board.mac) {
                            log::info!(
                                "  found {} ({}) at {}",
                                board.board,
                                board.mac_address,
                                board.board_address
                            );
                            boards.push(board);
                        }
                    }
                    Err(e) => log::warn!("ignoring undecodable reply from {}: {}", source, e),
                }
            }
            Err(FlashError::Timeout(_)) => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(boards)
}
