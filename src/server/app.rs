//! Server application implementation

use anyhow::Result;
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use warp::Filter;

use super::ServerConfig;
use crate::models::{BoardDescriptor, FlashStatus};

/// Server application main struct
pub struct ServerApp {
    config: ServerConfig,
    state: Arc<RwLock<ServerState>>,
}

/// Shared server state.
///
/// Operations never rely on an implicit "current board": every request
/// names its target by MAC, and this state only caches what discovery last
/// reported, so concurrent sessions stay independent.
#[derive(Debug)]
pub struct ServerState {
    pub config: ServerConfig,
    /// Last descriptor seen per board, keyed by colon-hex MAC
    pub boards: HashMap<String, BoardDescriptor>,
    pub last_discovery: Option<DateTime<Local>>,
    /// Background flash operations by id
    pub flash_operations: HashMap<String, FlashStatus>,
    /// Serialized FlashEvent JSON fanned out to /ws/progress subscribers
    pub progress_tx: broadcast::Sender<String>,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        let (progress_tx, _) = broadcast::channel(256);
        Self {
            config,
            boards: HashMap::new(),
            last_discovery: None,
            flash_operations: HashMap::new(),
            progress_tx,
        }
    }

    /// Replace cached descriptors with a fresh discovery result.
    ///
    /// Descriptors are replaced whole, never field-patched.
    pub fn cache_boards(&mut self, boards: &[BoardDescriptor]) {
        for board in boards {
            self.boards
                .insert(board.mac_address.clone(), board.clone());
        }
        self.last_discovery = Some(Local::now());
    }
}

impl ServerApp {
    pub async fn new(config: ServerConfig) -> Result<Self> {
        let state = Arc::new(RwLock::new(ServerState::new(config.clone())));
        Ok(Self { config, state })
    }

    pub fn get_state(&self) -> Arc<RwLock<ServerState>> {
        Arc::clone(&self.state)
    }

    pub async fn run(self) -> Result<()> {
        let state = self.get_state();
        let max_upload = self.config.max_image_size_mb * 1024 * 1024;

        let api_routes = crate::server::routes::boards::create_board_routes(state.clone())
            .or(crate::server::routes::interfaces::create_interface_routes())
            .or(crate::server::routes::address::create_address_route(state.clone()))
            .or(crate::server::routes::erase::create_erase_route(state.clone()))
            .or(crate::server::routes::flash::create_flash_routes(
                state.clone(),
                max_upload,
            ));

        let health_route = crate::server::routes::health::create_health_route(state.clone());
        let ws_route = crate::server::routes::websocket::create_progress_route(state.clone());

        let all_routes = api_routes.or(ws_route).or(health_route);

        let cors = warp::cors()
            .allow_any_origin()
            .allow_headers(vec!["content-type"])
            .allow_methods(vec!["GET", "POST", "OPTIONS"]);

        let logging = crate::server::middleware::logging::with_request_logging();
        let routes = all_routes.with(logging).with(cors);

        let bind_addr: std::net::SocketAddr =
            format!("{}:{}", self.config.bind_address, self.config.port)
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid bind address: {}", e))?;

        log::info!("Server listening on http://{}", bind_addr);
        log::info!("API endpoints:");
        log::info!("   GET  /api/v1/interfaces   - List host network interfaces");
        log::info!("   POST /api/v1/discover     - Discover boards on an interface");
        log::info!("   GET  /api/v1/boards       - Cached board descriptors");
        log::info!("   POST /api/v1/address      - Set a board's IPv4 address");
        log::info!("   POST /api/v1/erase        - Erase a board's firmware flash");
        log::info!("   POST /api/v1/flash        - Upload an RBF and flash a board");
        log::info!("   GET  /api/v1/flash/{{id}}   - Flash operation status");
        log::info!("   WS   /ws/progress         - Erase/program progress stream");
        log::info!("   GET  /health              - Health check");

        let (_addr, server) =
            warp::serve(routes).bind_with_graceful_shutdown(bind_addr, async move {
                let _ = tokio::signal::ctrl_c().await;
                log::info!("Received shutdown signal (Ctrl+C)...");
            });

        server.await;

        log::info!("Server shut down gracefully");
        Ok(())
    }
}
