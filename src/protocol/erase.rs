//! Flash erase
//!
//! One erase command, two acknowledgments: the board echoes sequence 0 with
//! command 3 once when the erase starts and again when the flash is blank.
//! Programming must not begin until the second acknowledgment has arrived.

use std::net::IpAddr;
use std::time::Instant;

use crate::errors::{FlashError, Result};
use crate::interfaces::NetworkInterfaceDescriptor;
use crate::models::{BoardDescriptor, EventSender, FlashEvent};
use crate::protocol::{DebugDump, RetryPolicy, emit, packet, transport::UdpTransport};

/// Erase a board's firmware flash, blocking until the board reports the
/// erase finished.
///
/// The erase command is retransmitted up to the policy bound while the
/// first acknowledgment is outstanding. After erase-started the board is
/// known to be working and is given the longer `erase_timeout` for the
/// completion acknowledgment; flash erase on large parts takes tens of
/// seconds.
pub fn erase(
    interface: &NetworkInterfaceDescriptor,
    board: &BoardDescriptor,
    policy: &RetryPolicy,
    events: Option<&EventSender>,
    dump: DebugDump,
) -> Result<()> {
    let local = interface
        .ipv4
        .map(IpAddr::V4)
        .ok_or_else(|| {
            FlashError::Interface(format!("interface {} has no IPv4 address", interface.name))
        })?;

    let transport = UdpTransport::bind(local, policy.receive_timeout)?;
    let request = packet::encode_erase();
    packet::dump("erase", &request, dump);

    log::info!(
        "Erase: {} -> {} ({})",
        transport.local_addr()?,
        board.board_address,
        board.mac_address
    );

    transport.send(board.board_address, &request)?;

    // Phase 1: wait for erase-started, retransmitting on silence
    let mut attempt = 0u32;
    loop {
        match transport.recv() {
            Ok((source, reply)) => {
                packet::dump("erase reply", &reply, dump);
                let header = packet::parse_reply_header(&reply)?;
                if header.command == packet::REPLY_ERASE_ACK && header.sequence == 0 {
                    log::info!("Erase started: acknowledged by {}", source);
                    emit(
                        events,
                        FlashEvent::EraseStarted {
                            mac_address: board.mac_address.clone(),
                        },
                    );
                    break;
                }
                log::debug!(
                    "ignoring reply seq={} cmd={} from {}",
                    header.sequence,
                    header.command,
                    source
                );
            }
            Err(FlashError::Timeout(_)) => {
                attempt += 1;
                if attempt > policy.max_retries {
                    return Err(FlashError::Timeout(format!(
                        "no erase acknowledgment from {} after {} attempts",
                        board.board_address,
                        attempt
                    )));
                }
                log::debug!("erase retransmit {}/{}", attempt, policy.max_retries);
                transport.send(board.board_address, &request)?;
            }
            Err(e) => return Err(e),
        }
    }

    // Phase 2: wait for erase-finished within the erase bound
    transport.set_read_timeout(policy.receive_timeout)?;
    let deadline = Instant::now() + policy.erase_timeout;
    loop {
        if Instant::now() >= deadline {
            return Err(FlashError::Timeout(format!(
                "erase did not finish within {} s",
                policy.erase_timeout.as_secs()
            )));
        }
        match transport.recv() {
            Ok((source, reply)) => {
                packet::dump("erase reply", &reply, dump);
                let header = packet::parse_reply_header(&reply)?;
                if header.command == packet::REPLY_ERASE_ACK && header.sequence == 0 {
                    log::info!("Erase finished: acknowledged by {}", source);
                    emit(
                        events,
                        FlashEvent::EraseFinished {
                            mac_address: board.mac_address.clone(),
                        },
                    );
                    return Ok(());
                }
                log::debug!(
                    "ignoring reply seq={} cmd={} from {}",
                    header.sequence,
                    header.command,
                    source
                );
            }
            Err(FlashError::Timeout(_)) => continue,
            Err(e) => return Err(e),
        }
    }
}
