//! Health check route

use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use warp::Filter;

use crate::server::app::ServerState;
use crate::server::routes::with_server_state;

/// GET /health - liveness plus a snapshot of the discovery cache
pub fn create_health_route(
    state: Arc<RwLock<ServerState>>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("health")
        .and(warp::get())
        .and(warp::path::end())
        .and(with_server_state(state))
        .and_then(health_handler)
}

async fn health_handler(
    state: Arc<RwLock<ServerState>>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let state = state.read().await;
    Ok(warp::reply::json(&json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "boards_cached": state.boards.len(),
        "last_discovery": state.last_discovery,
        "flash_operations": state.flash_operations.len(),
    })))
}
