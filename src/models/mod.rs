//! Data models and types used throughout hpsdrflash

pub mod board;
pub mod events;
pub mod responses;

// Re-export commonly used types
pub use board::*;
pub use events::*;
pub use responses::*;
