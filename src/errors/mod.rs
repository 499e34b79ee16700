//! Error types for hpsdrflash

pub mod types;

pub use types::*;
