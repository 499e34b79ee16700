//! Block-wise firmware programming
//!
//! Stop-and-wait: exactly one 256-byte block is in flight at a time. The
//! board acknowledges block i by echoing sequence i with command 4; the
//! next block is not sent until the previous one is acknowledged, so
//! sequence numbers advance 0, 1, ..., blocks-1 with no gaps.

use std::net::IpAddr;

use crate::errors::{FlashError, Result};
use crate::firmware::FirmwareImage;
use crate::interfaces::NetworkInterfaceDescriptor;
use crate::models::{BoardDescriptor, EventSender, FlashEvent};
use crate::protocol::{DebugDump, RetryPolicy, emit, packet, transport::UdpTransport};

/// How a programming run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramOutcome {
    /// Every block was individually acknowledged
    Completed,
    /// The board echoed the outstanding sequence with a non-block-ack
    /// command. The original tool treats this as "programming complete";
    /// kept as a terminal success, pending verification against real
    /// hardware.
    CompletedEarly,
}

/// Stream a firmware image to the board, one acknowledged block at a time.
///
/// A lost reply retransmits the outstanding block up to the policy bound,
/// and duplicate acknowledgments for earlier blocks are skipped; any other
/// sequence/command combination aborts the run with a protocol error. The
/// board's flash must have been erased first.
pub fn program(
    interface: &NetworkInterfaceDescriptor,
    board: &BoardDescriptor,
    image: &FirmwareImage,
    policy: &RetryPolicy,
    events: Option<&EventSender>,
    dump: DebugDump,
) -> Result<ProgramOutcome> {
    let local = interface
        .ipv4
        .map(IpAddr::V4)
        .ok_or_else(|| {
            FlashError::Interface(format!("interface {} has no IPv4 address", interface.name))
        })?;

    let transport = UdpTransport::bind(local, policy.receive_timeout)?;
    let blocks = image.blocks();

    log::info!(
        "Program: {} -> {} ({})",
        transport.local_addr()?,
        board.board_address,
        board.mac_address
    );
    log::info!("  image: {} ({} bytes)", image.source(), image.len());
    log::info!("  in memory: {} bytes, {} blocks", image.padded_len(), blocks);

    emit(
        events,
        FlashEvent::ProgramStarted {
            mac_address: board.mac_address.clone(),
            total_blocks: blocks,
        },
    );

    for sequence in 0..blocks {
        // blocks() bounds the loop, so the chunk always exists
        let payload = image
            .block(sequence)
            .ok_or_else(|| FlashError::Firmware(format!("block {} out of range", sequence)))?;
        let request = packet::encode_program_block(sequence, blocks, &payload);
        packet::dump("program block", &request, dump);

        let mut attempt = 0u32;
        transport.send(board.board_address, &request)?;
        loop {
            let (source, reply) = match transport.recv() {
                Ok(received) => received,
                Err(FlashError::Timeout(_)) => {
                    attempt += 1;
                    if attempt > policy.max_retries {
                        return Err(FlashError::Timeout(format!(
                            "no acknowledgment for block {} of {} after {} attempts",
                            sequence, blocks, attempt
                        )));
                    }
                    log::debug!(
                        "block {} retransmit {}/{}",
                        sequence,
                        attempt,
                        policy.max_retries
                    );
                    transport.send(board.board_address, &request)?;
                    continue;
                }
                Err(e) => return Err(e),
            };

            packet::dump("program reply", &reply, dump);
            let header = packet::parse_reply_header(&reply)?;

            if header.command == packet::REPLY_BLOCK_ACK {
                if header.sequence == sequence {
                    log::debug!("block {}/{} acknowledged by {}", sequence + 1, blocks, source);
                    emit(
                        events,
                        FlashEvent::BlockProgrammed {
                            mac_address: board.mac_address.clone(),
                            block: sequence,
                            total_blocks: blocks,
                            percent: FlashEvent::percent(sequence, blocks),
                        },
                    );
                    break;
                }
                if header.sequence < sequence {
                    // A retransmitted block earns a second acknowledgment
                    // that lands while the next block is outstanding; stale
                    // duplicates are stop-and-wait residue, not a violation
                    log::debug!(
                        "ignoring duplicate ack for block {} while {} is outstanding",
                        header.sequence,
                        sequence
                    );
                    continue;
                }
            }

            if header.sequence == sequence {
                // Sequence matches but the command is not block-ack: the
                // board is signalling the run is complete
                log::info!(
                    "Program complete: board signalled completion at block {} of {}",
                    sequence,
                    blocks
                );
                emit(
                    events,
                    FlashEvent::ProgramCompleted {
                        mac_address: board.mac_address.clone(),
                        early: true,
                    },
                );
                return Ok(ProgramOutcome::CompletedEarly);
            }

            return Err(FlashError::Protocol(format!(
                "unexpected reply while programming: sent seq {}, got seq {} cmd {} from {}",
                sequence, header.sequence, header.command, source
            )));
        }
    }

    log::info!("Program complete: {} blocks acknowledged", blocks);
    emit(
        events,
        FlashEvent::ProgramCompleted {
            mac_address: board.mac_address.clone(),
            early: false,
        },
    );
    Ok(ProgramOutcome::Completed)
}
