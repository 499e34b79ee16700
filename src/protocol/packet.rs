//! Fixed-layout control packet encoding and reply decoding
//!
//! All packets are big-endian with the layout the boards have shipped with
//! since protocol 2: a 4-byte sequence number, a command byte, then
//! command-specific fields. Sizes and offsets are normative; they must match
//! bit-for-bit for interoperability with existing hardware.

use std::net::{Ipv4Addr, SocketAddr};

use crate::errors::{FlashError, Result};
use crate::firmware::BLOCK_SIZE;
use crate::models::{
    BoardDescriptor, BoardKind, BoardStatus, FrequencyInput, IqFormat, SubsystemVersions,
};
use crate::protocol::DebugDump;

/// Size of every control packet and board reply
pub const CONTROL_PACKET_LEN: usize = 60;

/// Size of a program-block packet: 9-byte header + 256-byte payload
pub const PROGRAM_PACKET_LEN: usize = 265;

/// Command bytes for outgoing packets
pub const CMD_DISCOVER: u8 = 0x02;
pub const CMD_SET_ADDRESS: u8 = 0x03;
pub const CMD_ERASE: u8 = 0x04;
pub const CMD_PROGRAM: u8 = 0x05;

/// Reply command acknowledging an erase phase
pub const REPLY_ERASE_ACK: u8 = 3;
/// Reply command acknowledging a program block
pub const REPLY_BLOCK_ACK: u8 = 4;

/// Minimum bytes to read a reply header (sequence + command)
pub const MIN_REPLY_LEN: usize = 5;
/// Minimum bytes for a decodable discovery reply (fields end at offset 22)
pub const MIN_DISCOVERY_REPLY_LEN: usize = 23;

/// Build the 60-byte discovery broadcast packet
pub fn encode_discover() -> [u8; CONTROL_PACKET_LEN] {
    let mut buf = [0u8; CONTROL_PACKET_LEN];
    buf[4] = CMD_DISCOVER;
    buf
}

/// Build the 60-byte set-address packet: target MAC at [5:11), new IPv4
/// octets at [11:15)
pub fn encode_set_address(mac: &[u8; 6], new_ip: Ipv4Addr) -> [u8; CONTROL_PACKET_LEN] {
    let mut buf = [0u8; CONTROL_PACKET_LEN];
    buf[4] = CMD_SET_ADDRESS;
    buf[5..11].copy_from_slice(mac);
    buf[11..15].copy_from_slice(&new_ip.octets());
    buf
}

/// Build the 60-byte flash erase packet
pub fn encode_erase() -> [u8; CONTROL_PACKET_LEN] {
    let mut buf = [0u8; CONTROL_PACKET_LEN];
    buf[4] = CMD_ERASE;
    buf
}

/// Build a 265-byte program-block packet: sequence at [0:4), total block
/// count at [5:9), payload at [9:265)
pub fn encode_program_block(
    sequence: u32,
    total_blocks: u32,
    payload: &[u8; BLOCK_SIZE],
) -> [u8; PROGRAM_PACKET_LEN] {
    let mut buf = [0u8; PROGRAM_PACKET_LEN];
    buf[0..4].copy_from_slice(&sequence.to_be_bytes());
    buf[4] = CMD_PROGRAM;
    buf[5..9].copy_from_slice(&total_blocks.to_be_bytes());
    buf[9..].copy_from_slice(payload);
    buf
}

/// Sequence number and command byte echoed in every board reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyHeader {
    pub sequence: u32,
    pub command: u8,
}

/// Decode a reply header, validating length first
pub fn parse_reply_header(buf: &[u8]) -> Result<ReplyHeader> {
    if buf.len() < MIN_REPLY_LEN {
        return Err(FlashError::Protocol(format!(
            "reply too short for a header: {} bytes",
            buf.len()
        )));
    }
    Ok(ReplyHeader {
        sequence: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
        command: buf[4],
    })
}

/// Decode a one-byte "X.Y" version field
pub fn decode_version(byte: u8) -> String {
    format!("{}.{}", byte / 10, byte % 10)
}

/// Parse a discovery reply into a full board descriptor.
///
/// `pc_address` is the local socket address the discovery was sent from and
/// `source` is where the reply arrived from; both end up in the descriptor
/// so later exchanges know how to reach the board.
pub fn parse_discovery_reply(
    buf: &[u8],
    pc_address: &str,
    source: SocketAddr,
) -> Result<BoardDescriptor> {
    if buf.len() < MIN_DISCOVERY_REPLY_LEN {
        return Err(FlashError::Protocol(format!(
            "discovery reply too short: {} bytes, need {}",
            buf.len(),
            MIN_DISCOVERY_REPLY_LEN
        )));
    }

    let mut mac = [0u8; 6];
    mac.copy_from_slice(&buf[5..11]);

    let status = match buf[4] {
        2 => BoardStatus::NotRunning,
        3 => BoardStatus::Running,
        _ => BoardStatus::Unknown,
    };

    let freq_input = if buf[21] == 0 {
        FrequencyInput::Frequency
    } else {
        FrequencyInput::PhaseWord
    };

    Ok(BoardDescriptor {
        status,
        board: BoardKind::from_type_byte(buf[11]),
        mac_address: BoardDescriptor::format_mac(&mac),
        mac,
        pc_address: pc_address.to_string(),
        board_address: source,
        protocol: decode_version(buf[12]),
        firmware: decode_version(buf[13]),
        subsystems: SubsystemVersions {
            mercury1: decode_version(buf[14]),
            mercury2: decode_version(buf[15]),
            mercury3: decode_version(buf[16]),
            mercury4: decode_version(buf[17]),
            penelope: decode_version(buf[18]),
            metis: decode_version(buf[19]),
        },
        receivers: buf[20],
        freq_input,
        iq_format: IqFormat::from_byte(buf[22]),
    })
}

/// Log a packet dump in the configured format
pub fn dump(label: &str, buf: &[u8], mode: DebugDump) {
    match mode {
        DebugDump::None => {}
        DebugDump::Dec => log::debug!("{}: {:?}", label, buf),
        DebugDump::Hex => {
            let hex: String = buf.iter().map(|b| format!("{:02x}", b)).collect();
            log::debug!("{}: {}", label, hex);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn any_source() -> SocketAddr {
        "192.168.1.44:1024".parse().unwrap()
    }

    #[test]
    fn test_discover_layout() {
        let buf = encode_discover();
        assert_eq!(buf.len(), 60);
        assert_eq!(&buf[0..4], &[0, 0, 0, 0]);
        assert_eq!(buf[4], 0x02);
        assert!(buf[5..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_erase_layout() {
        let buf = encode_erase();
        assert_eq!(buf.len(), 60);
        assert_eq!(buf[4], 0x04);
        assert!(buf[5..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_set_address_octet_placement() {
        let mac = [0x00, 0x1c, 0xc0, 0xa2, 0x13, 0x01];
        let buf = encode_set_address(&mac, "192.168.1.5".parse().unwrap());
        assert_eq!(buf[4], 0x03);
        assert_eq!(&buf[5..11], &mac);
        assert_eq!(&buf[11..15], &[192, 168, 1, 5]);
        assert!(buf[15..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_program_block_layout() {
        let payload = [0x5A; 256];
        let buf = encode_program_block(7, 1234, &payload);
        assert_eq!(buf.len(), 265);
        assert_eq!(&buf[0..4], &7u32.to_be_bytes());
        assert_eq!(buf[4], 0x05);
        assert_eq!(&buf[5..9], &1234u32.to_be_bytes());
        assert_eq!(&buf[9..], &payload[..]);
    }

    #[test]
    fn test_header_round_trip() {
        // encode(decode(p)) == p for the fields a reply echoes back
        for (seq, cmd) in [(0u32, CMD_DISCOVER), (41, CMD_PROGRAM), (u32::MAX, 0xFF)] {
            let mut buf = [0u8; CONTROL_PACKET_LEN];
            buf[0..4].copy_from_slice(&seq.to_be_bytes());
            buf[4] = cmd;
            let header = parse_reply_header(&buf).unwrap();
            assert_eq!(header, ReplyHeader { sequence: seq, command: cmd });
        }
    }

    #[test]
    fn test_header_rejects_short_buffer() {
        let err = parse_reply_header(&[0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, FlashError::Protocol(_)));
    }

    #[test]
    fn test_version_decoding() {
        assert_eq!(decode_version(23), "2.3");
        assert_eq!(decode_version(100), "10.0");
        assert_eq!(decode_version(0), "0.0");
    }

    fn sample_reply() -> [u8; 60] {
        let mut buf = [0u8; 60];
        buf[4] = 2; // not running
        buf[5..11].copy_from_slice(&[0x00, 0x1c, 0xc0, 0xa2, 0x13, 0x01]);
        buf[11] = 3; // ANGELIA
        buf[12] = 17; // protocol 1.7
        buf[13] = 23; // firmware 2.3
        buf[18] = 12; // penelope 1.2
        buf[20] = 4; // receivers
        buf[21] = 0; // frequency input
        buf[22] = 3; // 1 Float format
        buf
    }

    #[test]
    fn test_discovery_reply_parse() {
        let board =
            parse_discovery_reply(&sample_reply(), "192.168.1.2:39000", any_source()).unwrap();
        assert_eq!(board.status, BoardStatus::NotRunning);
        assert_eq!(board.board, BoardKind::Angelia);
        assert_eq!(board.mac_address, "0:1c:c0:a2:13:1");
        assert_eq!(board.protocol, "1.7");
        assert_eq!(board.firmware, "2.3");
        assert_eq!(board.subsystems.penelope, "1.2");
        assert_eq!(board.receivers, 4);
        assert_eq!(board.freq_input, FrequencyInput::Frequency);
        assert_eq!(board.iq_format, IqFormat::OneFloat);
        assert_eq!(board.board_address, any_source());
    }

    #[test]
    fn test_discovery_reply_rejects_short_buffer() {
        let err = parse_discovery_reply(&[0u8; 22], "x", any_source()).unwrap_err();
        assert!(matches!(err, FlashError::Protocol(_)));
    }

    #[test]
    fn test_unknown_board_type_does_not_fail() {
        let mut buf = sample_reply();
        buf[11] = 99;
        let board = parse_discovery_reply(&buf, "x", any_source()).unwrap();
        assert_eq!(board.board, BoardKind::Unknown);
    }
}
