//! Board-related data models

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Run state reported in the discovery reply command byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoardStatus {
    /// Bootloader is answering, application firmware is not running (cmd 2)
    NotRunning,
    /// Application firmware is running (cmd 3)
    Running,
    /// Command byte outside the known range
    Unknown,
}

impl std::fmt::Display for BoardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoardStatus::NotRunning => write!(f, "not running"),
            BoardStatus::Running => write!(f, "running"),
            BoardStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Hardware model identified by the board-type byte in the discovery reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoardKind {
    Atlas,
    Hermes,
    Angelia,
    Orion,
    Anan10E,
    HermesLite,
    Unknown,
}

impl BoardKind {
    /// Map the discovery-reply type byte to a board model.
    ///
    /// Bytes 1 and 2 both identify Hermes variants. Unknown bytes map to
    /// `Unknown` rather than failing so new hardware still discovers.
    pub fn from_type_byte(byte: u8) -> Self {
        match byte {
            0 => BoardKind::Atlas,
            1 | 2 => BoardKind::Hermes,
            3 => BoardKind::Angelia,
            4 => BoardKind::Orion,
            5 => BoardKind::Anan10E,
            6 => BoardKind::HermesLite,
            _ => BoardKind::Unknown,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BoardKind::Atlas => "ATLAS",
            BoardKind::Hermes => "HERMES",
            BoardKind::Angelia => "ANGELIA",
            BoardKind::Orion => "ORION",
            BoardKind::Anan10E => "ANAN-10E",
            BoardKind::HermesLite => "HERMES-LITE",
            BoardKind::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for BoardKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How the board expects receiver frequencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrequencyInput {
    Frequency,
    PhaseWord,
}

impl std::fmt::Display for FrequencyInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrequencyInput::Frequency => write!(f, "Frequency"),
            FrequencyInput::PhaseWord => write!(f, "Phase_word"),
        }
    }
}

/// IQ sample encoding announced by the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IqFormat {
    BigEndian3Byte,
    LittleEndian,
    ThreeByte,
    OneFloat,
    OneDouble,
    Unknown,
}

impl IqFormat {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0 => IqFormat::BigEndian3Byte,
            1 => IqFormat::LittleEndian,
            2 => IqFormat::ThreeByte,
            3 => IqFormat::OneFloat,
            4 => IqFormat::OneDouble,
            _ => IqFormat::Unknown,
        }
    }
}

impl std::fmt::Display for IqFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IqFormat::BigEndian3Byte => "Big-Endian IQ in 3 byte format",
            IqFormat::LittleEndian => "Little-Endian",
            IqFormat::ThreeByte => "3 Byte format",
            IqFormat::OneFloat => "1 Float format",
            IqFormat::OneDouble => "1 Double format",
            IqFormat::Unknown => "Unknown",
        };
        write!(f, "{}", s)
    }
}

/// Firmware versions of the auxiliary Atlas subsystems reported alongside
/// the main firmware version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsystemVersions {
    pub mercury1: String,
    pub mercury2: String,
    pub mercury3: String,
    pub mercury4: String,
    pub penelope: String,
    pub metis: String,
}

/// One discovered HPSDR board, built whole from a single discovery reply.
///
/// A rediscovery replaces the entire value; fields are never patched in
/// place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardDescriptor {
    /// Run state from the reply command byte
    pub status: BoardStatus,
    /// Hardware model
    pub board: BoardKind,
    /// Raw link-layer address, always exactly 6 bytes
    pub mac: [u8; 6],
    /// Colon-hex rendering of `mac`
    pub mac_address: String,
    /// Local socket address the discovery was sent from
    pub pc_address: String,
    /// Address the reply was observed from; programming targets this
    pub board_address: SocketAddr,
    /// Protocol version, "X.Y"
    pub protocol: String,
    /// Main firmware version, "X.Y"
    pub firmware: String,
    /// Auxiliary subsystem firmware versions
    pub subsystems: SubsystemVersions,
    /// Number of receivers the firmware exposes
    pub receivers: u8,
    /// Frequency input mode
    pub freq_input: FrequencyInput,
    /// IQ sample format
    pub iq_format: IqFormat,
}

impl BoardDescriptor {
    /// Colon-hex rendering used for MAC matching and display
    pub fn format_mac(mac: &[u8; 6]) -> String {
        format!(
            "{:x}:{:x}:{:x}:{:x}:{:x}:{:x}",
            mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
        )
    }
}

/// Outcome of a set-address request.
///
/// The exchange is fire-and-forget; this records what was sent. The caller
/// confirms the change with a rediscovery after a settling delay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetAddressResult {
    pub old_address: String,
    pub new_address: String,
    pub mac_address: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_kind_mapping() {
        assert_eq!(BoardKind::from_type_byte(0), BoardKind::Atlas);
        assert_eq!(BoardKind::from_type_byte(1), BoardKind::Hermes);
        assert_eq!(BoardKind::from_type_byte(2), BoardKind::Hermes);
        assert_eq!(BoardKind::from_type_byte(3), BoardKind::Angelia);
        assert_eq!(BoardKind::from_type_byte(4), BoardKind::Orion);
        assert_eq!(BoardKind::from_type_byte(5), BoardKind::Anan10E);
        assert_eq!(BoardKind::from_type_byte(6), BoardKind::HermesLite);
        assert_eq!(BoardKind::from_type_byte(99), BoardKind::Unknown);
    }

    #[test]
    fn test_board_kind_names() {
        assert_eq!(BoardKind::from_type_byte(3).name(), "ANGELIA");
        assert_eq!(BoardKind::from_type_byte(99).name(), "Unknown");
    }

    #[test]
    fn test_iq_format_mapping() {
        assert_eq!(IqFormat::from_byte(0), IqFormat::BigEndian3Byte);
        assert_eq!(IqFormat::from_byte(4), IqFormat::OneDouble);
        assert_eq!(IqFormat::from_byte(7), IqFormat::Unknown);
    }

    #[test]
    fn test_format_mac() {
        let mac = [0x00, 0x1c, 0xc0, 0xa2, 0x13, 0x01];
        assert_eq!(BoardDescriptor::format_mac(&mac), "0:1c:c0:a2:13:1");
    }

}
