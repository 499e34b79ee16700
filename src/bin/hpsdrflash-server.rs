//! hpsdrflash server - remote OpenHPSDR board flashing
//!
//! Binary entry point for the server application.

use anyhow::Result;
use clap::{Parser, Subcommand};
use hpsdrflash::interfaces;
use hpsdrflash::server::{ServerConfig, start_server};
use hpsdrflash::utils;

#[derive(Parser)]
#[command(name = "hpsdrflash-server")]
#[command(version)]
#[command(about = "Remote OpenHPSDR board flashing server")]
struct ServerCli {
    /// Bind address
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Largest accepted RBF upload, megabytes
    #[arg(long, default_value = "64")]
    max_upload_mb: usize,

    /// Discovery collection window, milliseconds
    #[arg(long, default_value = "2000")]
    wait: u64,

    #[command(subcommand)]
    command: Option<ServerCommands>,
}

#[derive(Subcommand)]
enum ServerCommands {
    /// Start the server
    Start,
    /// List host network interfaces and exit
    Interfaces,
}

#[tokio::main]
async fn main() -> Result<()> {
    utils::logging::init_server_logging(None)?;

    let cli = ServerCli::parse();

    let config = ServerConfig {
        bind_address: cli.bind,
        port: cli.port,
        max_image_size_mb: cli.max_upload_mb,
        discovery_wait_ms: cli.wait,
    };

    match cli.command {
        Some(ServerCommands::Start) | None => start_server(config).await,
        Some(ServerCommands::Interfaces) => list_interfaces().await,
    }
}

async fn list_interfaces() -> Result<()> {
    let list = tokio::task::spawn_blocking(interfaces::enumerate).await??;
    if list.is_empty() {
        println!("No network interfaces with addresses found.");
        return Ok(());
    }
    for descriptor in &list {
        let ipv4 = descriptor
            .ipv4
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {} - {} ({}) {}",
            descriptor.index, descriptor.name, descriptor.mac, ipv4
        );
    }
    Ok(())
}
