//! OpenHPSDR protocol-2 bootstrap exchanges
//!
//! Four request/response exchanges over UDP: board discovery, network
//! address reconfiguration, flash erase, and block-wise firmware
//! programming. Execution is synchronous and single-threaded per call; the
//! UDP socket lives exactly as long as one protocol call. Concurrent calls
//! against the same board must be serialized by the caller.

pub mod discovery;
pub mod erase;
pub mod packet;
pub mod program;
pub mod set_address;
pub mod transport;

pub use discovery::{discover, discover_all};
pub use erase::erase;
pub use program::{ProgramOutcome, program};
pub use set_address::{is_dhcp_sentinel, set_address};
pub use transport::UdpTransport;

use std::time::Duration;

/// Bounds for the blocking receives inside a protocol call.
///
/// The wire protocol itself has no timeouts or retransmissions; a silent
/// board would stall the calling thread forever. Every receive therefore
/// carries a deadline, and the outstanding request is retransmitted a
/// bounded number of times before the call fails with a timeout.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Deadline for one blocking receive
    pub receive_timeout: Duration,
    /// Retransmissions of the outstanding request before giving up
    pub max_retries: u32,
    /// Total wait for erase completion after the erase-started
    /// acknowledgment; flash erase on large parts takes tens of seconds
    pub erase_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            receive_timeout: Duration::from_secs(2),
            max_retries: 3,
            erase_timeout: Duration::from_secs(60),
        }
    }
}

/// Wire-level packet dump verbosity, from the original tool's debug flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugDump {
    /// No packet dumps
    #[default]
    None,
    /// Dump packets as decimal byte lists
    Dec,
    /// Dump packets as hex strings
    Hex,
}

impl std::fmt::Display for DebugDump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DebugDump::None => write!(f, "none"),
            DebugDump::Dec => write!(f, "dec"),
            DebugDump::Hex => write!(f, "hex"),
        }
    }
}

impl std::str::FromStr for DebugDump {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "" => Ok(DebugDump::None),
            "dec" | "decimal" => Ok(DebugDump::Dec),
            "hex" => Ok(DebugDump::Hex),
            other => Err(format!("unknown debug mode: {}", other)),
        }
    }
}

pub(crate) fn emit(events: Option<&crate::models::EventSender>, event: crate::models::FlashEvent) {
    if let Some(tx) = events {
        // A hung-up listener never fails the protocol run
        let _ = tx.send(event);
    }
}
