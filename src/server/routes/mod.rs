//! HTTP routes for the hpsdrflash server

pub mod address;
pub mod boards;
pub mod erase;
pub mod flash;
pub mod health;
pub mod interfaces;
pub mod websocket;

use crate::server::app::ServerState;
use std::sync::Arc;
use tokio::sync::RwLock;
use warp::Filter;

/// Helper filter that hands the shared state to handlers
pub fn with_server_state(
    state: Arc<RwLock<ServerState>>,
) -> impl Filter<Extract = (Arc<RwLock<ServerState>>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || Arc::clone(&state))
}
