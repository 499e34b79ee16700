//! JSON request/response payloads for the hpsdrflash server API

use serde::{Deserialize, Serialize};

use crate::models::board::{BoardDescriptor, SetAddressResult};

/// POST /api/v1/discover request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverRequest {
    /// Host interface to discover on (index from /api/v1/interfaces)
    pub interface_index: u32,
    /// Collect every board answering within `wait_ms` instead of returning
    /// the first reply
    #[serde(default)]
    pub all: bool,
    /// Collection window for `all` discovery, milliseconds; falls back to
    /// the server's configured window
    #[serde(default)]
    pub wait_ms: Option<u64>,
}

/// Discovery response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverResponse {
    pub success: bool,
    pub message: String,
    pub boards: Vec<BoardDescriptor>,
}

/// POST /api/v1/address request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressRequest {
    pub interface_index: u32,
    /// Target board MAC in colon-hex form, as reported by discovery
    pub mac_address: String,
    /// Dotted-quad new address; "0.0.0.0" or "255.255.255.255" revert to DHCP
    pub new_ip: String,
}

/// Set-address response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressResponse {
    pub success: bool,
    pub message: String,
    pub result: Option<SetAddressResult>,
}

/// POST /api/v1/erase request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EraseRequest {
    pub interface_index: u32,
    pub mac_address: String,
}

/// Generic operation response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResponse {
    pub success: bool,
    pub message: String,
}

/// Response for flash submissions: the upload is accepted and runs in the
/// background, progress streams over /ws/progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashResponse {
    pub success: bool,
    pub message: String,
    /// Identifier for polling /api/v1/flash/{id}
    pub flash_id: Option<String>,
}

/// Status of one background flash operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashStatus {
    pub flash_id: String,
    pub mac_address: String,
    pub state: FlashState,
    pub message: String,
    pub percent: f32,
}

/// Lifecycle of a background flash operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashState {
    Pending,
    Erasing,
    Programming,
    Completed,
    Failed,
}

impl std::fmt::Display for FlashState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlashState::Pending => write!(f, "pending"),
            FlashState::Erasing => write!(f, "erasing"),
            FlashState::Programming => write!(f, "programming"),
            FlashState::Completed => write!(f, "completed"),
            FlashState::Failed => write!(f, "failed"),
        }
    }
}
