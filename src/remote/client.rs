//! HTTP/WebSocket client for the hpsdrflash-server API

use anyhow::{Context, Result, anyhow};
use futures_util::StreamExt;
use std::path::Path;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use crate::models::{
    AddressResponse, DiscoverRequest, DiscoverResponse, FlashEvent, FlashResponse,
};

/// Client bound to one server URL
pub struct RemoteClient {
    base_url: String,
    http: reqwest::Client,
}

impl RemoteClient {
    pub fn new(server_url: &str) -> Self {
        Self {
            base_url: server_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Trigger a discovery on the server's interface and return the boards
    pub async fn discover(&self, interface_index: u32, all: bool) -> Result<DiscoverResponse> {
        let request = DiscoverRequest {
            interface_index,
            all,
            wait_ms: None,
        };
        let response = self
            .http
            .post(format!("{}/api/v1/discover", self.base_url))
            .json(&request)
            .send()
            .await
            .context("discover request failed")?;
        response
            .json::<DiscoverResponse>()
            .await
            .context("invalid discover response")
    }

    /// Ask the server to push a new address to a board
    pub async fn set_address(
        &self,
        interface_index: u32,
        mac_address: &str,
        new_ip: &str,
    ) -> Result<AddressResponse> {
        let response = self
            .http
            .post(format!("{}/api/v1/address", self.base_url))
            .json(&serde_json::json!({
                "interface_index": interface_index,
                "mac_address": mac_address,
                "new_ip": new_ip,
            }))
            .send()
            .await
            .context("address request failed")?;
        response
            .json::<AddressResponse>()
            .await
            .context("invalid address response")
    }

    /// Upload an RBF and start an erase + program run on the server
    pub async fn flash(
        &self,
        interface_index: u32,
        mac_address: &str,
        rbf_path: &Path,
    ) -> Result<FlashResponse> {
        let data = tokio::fs::read(rbf_path)
            .await
            .with_context(|| format!("failed to read {}", rbf_path.display()))?;
        let file_name = rbf_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("firmware.rbf")
            .to_string();

        let form = reqwest::multipart::Form::new()
            .text("interface_index", interface_index.to_string())
            .text("mac_address", mac_address.to_string())
            .part(
                "rbf",
                reqwest::multipart::Part::bytes(data).file_name(file_name),
            );

        let response = self
            .http
            .post(format!("{}/api/v1/flash", self.base_url))
            .multipart(form)
            .send()
            .await
            .context("flash upload failed")?;
        response
            .json::<FlashResponse>()
            .await
            .context("invalid flash response")
    }

    /// Follow the progress WebSocket, printing each event, until a
    /// completion or failure event arrives (or the stream closes)
    pub async fn watch_progress(&self) -> Result<()> {
        let ws_url = format!(
            "{}/ws/progress",
            self.base_url
                .replacen("http://", "ws://", 1)
                .replacen("https://", "wss://", 1)
        );

        let (stream, _) = connect_async(&ws_url)
            .await
            .with_context(|| format!("failed to connect to {}", ws_url))?;
        let (_, mut read) = stream.split();

        log::info!("Watching {} for progress events", ws_url);

        while let Some(message) = read.next().await {
            let message = message.context("progress stream error")?;
            let Message::Text(text) = message else {
                continue;
            };
            match serde_json::from_str::<FlashEvent>(&text) {
                Ok(event) => {
                    print_event(&event);
                    match event {
                        FlashEvent::ProgramCompleted { .. } => return Ok(()),
                        FlashEvent::Failed { error, .. } => {
                            return Err(anyhow!("remote flash failed: {}", error));
                        }
                        _ => {}
                    }
                }
                Err(_) => log::debug!("unrecognized progress payload: {}", text),
            }
        }

        Ok(())
    }
}

fn print_event(event: &FlashEvent) {
    match event {
        FlashEvent::EraseStarted { mac_address } => {
            println!("   Erase started: {}", mac_address)
        }
        FlashEvent::EraseFinished { mac_address } => {
            println!("  Erase finished: {}", mac_address)
        }
        FlashEvent::ProgramStarted {
            mac_address,
            total_blocks,
        } => println!(" Program started: {} ({} blocks)", mac_address, total_blocks),
        FlashEvent::BlockProgrammed {
            block,
            total_blocks,
            percent,
            ..
        } => {
            // One line per 64 blocks keeps long images readable
            if block % 64 == 0 || block + 1 == *total_blocks {
                println!("           block: {}/{} ({:.1}%)", block + 1, total_blocks, percent);
            }
        }
        FlashEvent::ProgramCompleted { mac_address, early } => {
            if *early {
                println!("Program complete: {} (board signalled early)", mac_address)
            } else {
                println!("Program complete: {}", mac_address)
            }
        }
        FlashEvent::Failed { mac_address, error } => {
            println!("          FAILED: {} ({})", mac_address, error)
        }
    }
}
