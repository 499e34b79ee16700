//! Client for a remote hpsdrflash-server
//!
//! Lets the CLI drive a server elsewhere on the network: trigger a
//! discovery, upload and flash an RBF, and follow the progress WebSocket.

pub mod client;

pub use client::RemoteClient;
