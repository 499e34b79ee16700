//! Discovery and cached-board routes

use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use warp::Filter;

use crate::models::{DiscoverRequest, DiscoverResponse};
use crate::protocol::{self, RetryPolicy};
use crate::server::app::ServerState;
use crate::server::routes::with_server_state;
use crate::{DebugDump, interfaces};

/// Create discovery and board listing routes
pub fn create_board_routes(
    state: Arc<RwLock<ServerState>>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let discover = warp::path("api")
        .and(warp::path("v1"))
        .and(warp::path("discover"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(with_server_state(state.clone()))
        .and_then(discover_handler);

    let boards = warp::path("api")
        .and(warp::path("v1"))
        .and(warp::path("boards"))
        .and(warp::path::end())
        .and(warp::get())
        .and(with_server_state(state))
        .and_then(list_boards_handler);

    discover.or(boards)
}

/// Handler for POST /api/v1/discover
async fn discover_handler(
    request: DiscoverRequest,
    state: Arc<RwLock<ServerState>>,
) -> Result<impl warp::Reply, warp::Rejection> {
    info!(
        "Discovery requested on interface {} (all={})",
        request.interface_index, request.all
    );

    let wait_ms = match request.wait_ms {
        Some(ms) => ms,
        None => state.read().await.config.discovery_wait_ms,
    };

    let result = tokio::task::spawn_blocking(move || {
        let interface = interfaces::by_index(request.interface_index)?;
        if request.all {
            protocol::discover_all(&interface, Duration::from_millis(wait_ms), DebugDump::None)
        } else {
            protocol::discover(&interface, &RetryPolicy::default(), DebugDump::None)
                .map(|board| vec![board])
        }
    })
    .await;

    let response = match result {
        Ok(Ok(boards)) => {
            state.write().await.cache_boards(&boards);
            DiscoverResponse {
                success: true,
                message: format!("{} board(s) found", boards.len()),
                boards,
            }
        }
        Ok(Err(e)) => {
            error!("Discovery failed: {}", e);
            DiscoverResponse {
                success: false,
                message: format!("Discovery failed: {}", e),
                boards: Vec::new(),
            }
        }
        Err(e) => {
            error!("Discovery task failed: {}", e);
            DiscoverResponse {
                success: false,
                message: "Internal task failure".to_string(),
                boards: Vec::new(),
            }
        }
    };

    Ok(warp::reply::json(&response))
}

/// Handler for GET /api/v1/boards - descriptors from the last discovery
async fn list_boards_handler(
    state: Arc<RwLock<ServerState>>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let state = state.read().await;
    let mut boards: Vec<_> = state.boards.values().cloned().collect();
    boards.sort_by(|a, b| a.mac_address.cmp(&b.mac_address));

    Ok(warp::reply::json(&serde_json::json!({
        "success": true,
        "boards": boards,
        "last_discovery": state.last_discovery,
    })))
}
