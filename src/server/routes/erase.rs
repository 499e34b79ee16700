//! Flash erase route

use log::{error, info};
use std::sync::Arc;
use tokio::sync::RwLock;
use warp::Filter;

use crate::models::{EraseRequest, OperationResponse};
use crate::server::app::ServerState;
use crate::server::routes::with_server_state;
use crate::server::services::FlashService;

/// POST /api/v1/erase - erase a board's firmware flash and wait for the
/// erase-finished acknowledgment
pub fn create_erase_route(
    state: Arc<RwLock<ServerState>>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("api")
        .and(warp::path("v1"))
        .and(warp::path("erase"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(with_server_state(state))
        .and_then(erase_handler)
}

async fn erase_handler(
    request: EraseRequest,
    state: Arc<RwLock<ServerState>>,
) -> Result<impl warp::Reply, warp::Rejection> {
    info!("Erase requested for {}", request.mac_address);
    let service = FlashService::new(state);

    let response = match service
        .erase_board(request.interface_index, &request.mac_address)
        .await
    {
        Ok(()) => OperationResponse {
            success: true,
            message: format!("Erase finished for {}", request.mac_address),
        },
        Err(e) => {
            error!("Erase failed: {}", e);
            OperationResponse {
                success: false,
                message: format!("Erase failed: {}", e),
            }
        }
    };

    Ok(warp::reply::json(&response))
}
