//! hpsdrflash - OpenHPSDR protocol-2 board programmer
//!
//! hpsdrflash discovers, reconfigures, and firmware-programs OpenHPSDR radio
//! interface boards (Hermes, Angelia, Orion, Hermes-Lite, ...) over UDP using
//! the protocol-2 bootstrap exchanges: discovery, set-address, flash erase,
//! and block-wise programming of RBF bitstream images.

pub mod config;
pub mod errors;
pub mod firmware;
pub mod interfaces;
pub mod models;
pub mod protocol;
pub mod remote;
pub mod server;
pub mod utils;

// Re-export commonly used types
pub use errors::*;
pub use firmware::FirmwareImage;
pub use models::*;
pub use protocol::{DebugDump, RetryPolicy};

/// hpsdrflash version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// hpsdrflash application name
pub const APP_NAME: &str = "hpsdrflash";

/// UDP port the protocol-2 bootstrap listens on
pub const CONTROL_PORT: u16 = 1024;
