//! hpsdrflash server module
//!
//! A long-running warp server wrapping the protocol engine: JSON endpoints
//! for discovery, address configuration, and erase, a multipart endpoint
//! for firmware flashing, and a WebSocket stream for erase/program
//! progress.

pub mod app;
pub mod middleware;
pub mod routes;
pub mod services;

pub use app::*;

use anyhow::Result;

/// Server configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ServerConfig {
    /// Listening address
    pub bind_address: String,
    /// Listening port
    pub port: u16,
    /// Maximum accepted RBF upload size in MB
    pub max_image_size_mb: usize,
    /// Default collection window for `all` discovery, milliseconds
    pub discovery_wait_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            max_image_size_mb: 64,
            discovery_wait_ms: 2000,
        }
    }
}

/// Start the hpsdrflash server
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let app = ServerApp::new(config).await?;
    app.run().await
}
