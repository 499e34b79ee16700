//! Progress events emitted by erase/program runs
//!
//! The protocol functions are synchronous; callers hand them a sender and
//! watch events from another thread (CLI progress lines, server WebSocket
//! broadcast).

use serde::{Deserialize, Serialize};

/// Progress notification for a running erase/program operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FlashEvent {
    /// Erase command acknowledged, flash erase is underway
    EraseStarted { mac_address: String },
    /// Second erase acknowledgment received, flash is blank
    EraseFinished { mac_address: String },
    /// Programming run started
    ProgramStarted {
        mac_address: String,
        total_blocks: u32,
    },
    /// One block acknowledged
    BlockProgrammed {
        mac_address: String,
        block: u32,
        total_blocks: u32,
        percent: f32,
    },
    /// Run finished; `early` marks the board signalling completion before
    /// every block was individually acknowledged
    ProgramCompleted { mac_address: String, early: bool },
    /// Operation failed
    Failed { mac_address: String, error: String },
}

impl FlashEvent {
    /// Percent helper for block progress
    pub fn percent(block: u32, total_blocks: u32) -> f32 {
        if total_blocks == 0 {
            100.0
        } else {
            (block + 1) as f32 * 100.0 / total_blocks as f32
        }
    }
}

/// Sink for progress events; senders ignore a disconnected receiver
pub type EventSender = std::sync::mpsc::Sender<FlashEvent>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent() {
        assert_eq!(FlashEvent::percent(0, 4), 25.0);
        assert_eq!(FlashEvent::percent(3, 4), 100.0);
        assert_eq!(FlashEvent::percent(0, 0), 100.0);
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let ev = FlashEvent::EraseStarted {
            mac_address: "0:1c:c0:a2:13:1".to_string(),
        };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains("\"event\":\"erase_started\""));
    }
}
