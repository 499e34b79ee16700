//! Erase/program orchestration for the server
//!
//! The protocol engine is synchronous, so every run goes through
//! `spawn_blocking`. Progress events cross from the blocking protocol
//! thread to the async side over an mpsc channel and fan out to WebSocket
//! subscribers through the state's broadcast sender.

use anyhow::{Context, Result, anyhow};
use log::{error, info};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::firmware::FirmwareImage;
use crate::models::{BoardDescriptor, FlashEvent, FlashState, FlashStatus};
use crate::protocol::{self, RetryPolicy};
use crate::server::app::ServerState;
use crate::{DebugDump, interfaces};

/// Service wrapping the protocol engine for server handlers
pub struct FlashService {
    state: Arc<RwLock<ServerState>>,
}

impl FlashService {
    pub fn new(state: Arc<RwLock<ServerState>>) -> Self {
        Self { state }
    }

    /// Look up a cached descriptor; operations never guess a target
    async fn resolve_board(&self, mac_address: &str) -> Result<BoardDescriptor> {
        self.state
            .read()
            .await
            .boards
            .get(mac_address)
            .cloned()
            .ok_or_else(|| {
                anyhow!(
                    "board {} not known; run a discovery first",
                    mac_address
                )
            })
    }

    /// Erase a board's flash, blocking the request until the second
    /// acknowledgment arrives. Progress still streams to /ws/progress.
    pub async fn erase_board(&self, interface_index: u32, mac_address: &str) -> Result<()> {
        let board = self.resolve_board(mac_address).await?;
        let progress_tx = self.state.read().await.progress_tx.clone();

        let (tx, rx) = std::sync::mpsc::channel::<FlashEvent>();
        let forwarder = tokio::task::spawn_blocking(move || {
            while let Ok(event) = rx.recv() {
                if let Ok(json) = serde_json::to_string(&event) {
                    let _ = progress_tx.send(json);
                }
            }
        });

        let worker = tokio::task::spawn_blocking(move || {
            let interface = interfaces::by_index(interface_index)?;
            protocol::erase(
                &interface,
                &board,
                &RetryPolicy::default(),
                Some(&tx),
                DebugDump::None,
            )
        });

        let result = worker.await.context("erase task panicked")?;
        let _ = forwarder.await;
        result.map_err(|e| anyhow!(e))
    }

    /// Start an erase + program run in the background, returning its id.
    ///
    /// Status is polled via /api/v1/flash/{id}; block-level progress
    /// streams over /ws/progress.
    pub async fn start_flash(
        &self,
        interface_index: u32,
        mac_address: &str,
        image: FirmwareImage,
    ) -> Result<String> {
        if image.blocks() == 0 {
            return Err(anyhow!("firmware image is empty"));
        }
        let board = self.resolve_board(mac_address).await?;
        let flash_id = Uuid::new_v4().to_string();

        {
            let mut state = self.state.write().await;
            state.flash_operations.insert(
                flash_id.clone(),
                FlashStatus {
                    flash_id: flash_id.clone(),
                    mac_address: mac_address.to_string(),
                    state: FlashState::Pending,
                    message: format!("queued, {} blocks", image.blocks()),
                    percent: 0.0,
                },
            );
        }

        let state = Arc::clone(&self.state);
        let id = flash_id.clone();
        tokio::spawn(async move {
            run_flash(state, id, board, image, interface_index).await;
        });

        Ok(flash_id)
    }
}

/// Drive one background erase + program run to completion
async fn run_flash(
    state: Arc<RwLock<ServerState>>,
    flash_id: String,
    board: BoardDescriptor,
    image: FirmwareImage,
    interface_index: u32,
) {
    let progress_tx = state.read().await.progress_tx.clone();
    let (tx, rx) = std::sync::mpsc::channel::<FlashEvent>();

    // Forward protocol events to WebSocket subscribers and keep the
    // polled status in step with them
    let fwd_state = Arc::clone(&state);
    let fwd_id = flash_id.clone();
    let forwarder = tokio::task::spawn_blocking(move || {
        while let Ok(event) = rx.recv() {
            if let Ok(json) = serde_json::to_string(&event) {
                let _ = progress_tx.send(json);
            }
            let mut st = fwd_state.blocking_write();
            if let Some(status) = st.flash_operations.get_mut(&fwd_id) {
                match &event {
                    FlashEvent::EraseStarted { .. } => {
                        status.state = FlashState::Erasing;
                        status.message = "erase started".to_string();
                    }
                    FlashEvent::EraseFinished { .. } => {
                        status.message = "erase finished".to_string();
                    }
                    FlashEvent::ProgramStarted { total_blocks, .. } => {
                        status.state = FlashState::Programming;
                        status.message = format!("programming {} blocks", total_blocks);
                    }
                    FlashEvent::BlockProgrammed { percent, .. } => {
                        status.percent = *percent;
                    }
                    FlashEvent::ProgramCompleted { early, .. } => {
                        status.percent = 100.0;
                        status.message = if *early {
                            "board signalled completion early".to_string()
                        } else {
                            "all blocks acknowledged".to_string()
                        };
                    }
                    FlashEvent::Failed { error, .. } => {
                        status.message = error.clone();
                    }
                }
            }
        }
    });

    let mac = board.mac_address.clone();
    let worker_tx = tx.clone();
    let worker = tokio::task::spawn_blocking(move || {
        let interface = interfaces::by_index(interface_index)?;
        let policy = RetryPolicy::default();
        protocol::erase(&interface, &board, &policy, Some(&worker_tx), DebugDump::None)?;
        protocol::program(
            &interface,
            &board,
            &image,
            &policy,
            Some(&worker_tx),
            DebugDump::None,
        )
    });

    let result = worker.await;

    // Surface failures to subscribers before the channel closes
    let outcome = match result {
        Ok(Ok(outcome)) => {
            info!("Flash {} completed: {:?}", flash_id, outcome);
            Ok(())
        }
        Ok(Err(e)) => {
            error!("Flash {} failed: {}", flash_id, e);
            let _ = tx.send(FlashEvent::Failed {
                mac_address: mac.clone(),
                error: e.to_string(),
            });
            Err(e.to_string())
        }
        Err(e) => {
            error!("Flash {} task panicked: {}", flash_id, e);
            Err("internal task failure".to_string())
        }
    };

    drop(tx);
    let _ = forwarder.await;

    let mut st = state.write().await;
    if let Some(status) = st.flash_operations.get_mut(&flash_id) {
        match outcome {
            Ok(()) => status.state = FlashState::Completed,
            Err(message) => {
                status.state = FlashState::Failed;
                status.message = message;
            }
        }
    }
}
