//! Custom error types for hpsdrflash

use std::fmt;

/// Main error type for protocol and application operations
#[derive(Debug)]
pub enum FlashError {
    /// Socket bind/send/receive failure at the OS level
    Transport(std::io::Error),
    /// Reply too short to decode, or a sequence/command combination outside
    /// the defined transitions
    Protocol(String),
    /// A blocking receive exceeded its configured bound
    Timeout(String),
    /// Firmware image loading/validation errors
    Firmware(String),
    /// Settings file errors
    Config(String),
    /// Network interface enumeration/selection errors
    Interface(String),
}

impl fmt::Display for FlashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlashError::Transport(err) => write!(f, "Transport error: {}", err),
            FlashError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            FlashError::Timeout(msg) => write!(f, "Timed out: {}", msg),
            FlashError::Firmware(msg) => write!(f, "Firmware error: {}", msg),
            FlashError::Config(msg) => write!(f, "Configuration error: {}", msg),
            FlashError::Interface(msg) => write!(f, "Interface error: {}", msg),
        }
    }
}

impl std::error::Error for FlashError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FlashError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FlashError {
    fn from(err: std::io::Error) -> Self {
        FlashError::Transport(err)
    }
}

impl From<serde_json::Error> for FlashError {
    fn from(err: serde_json::Error) -> Self {
        FlashError::Config(err.to_string())
    }
}

/// Result type alias for hpsdrflash operations
pub type Result<T> = std::result::Result<T, FlashError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind() {
        let err = FlashError::Protocol("reply too short: 4 bytes".to_string());
        assert!(err.to_string().contains("Protocol error"));

        let err = FlashError::Timeout("no discovery reply".to_string());
        assert!(err.to_string().contains("Timed out"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "bind");
        let err: FlashError = io.into();
        assert!(matches!(err, FlashError::Transport(_)));
    }
}
