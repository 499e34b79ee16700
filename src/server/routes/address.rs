//! Set-address route

use log::{error, info};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::sync::RwLock;
use warp::Filter;

use crate::models::{AddressRequest, AddressResponse};
use crate::protocol;
use crate::server::app::ServerState;
use crate::server::routes::with_server_state;
use crate::{DebugDump, interfaces};

/// POST /api/v1/address - push a new IPv4 address (or DHCP) to a board
pub fn create_address_route(
    state: Arc<RwLock<ServerState>>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("api")
        .and(warp::path("v1"))
        .and(warp::path("address"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(with_server_state(state))
        .and_then(set_address_handler)
}

async fn set_address_handler(
    request: AddressRequest,
    state: Arc<RwLock<ServerState>>,
) -> Result<impl warp::Reply, warp::Rejection> {
    info!(
        "Set-address requested: {} -> {}",
        request.mac_address, request.new_ip
    );

    let new_ip: Ipv4Addr = if request.new_ip.eq_ignore_ascii_case("dhcp") {
        Ipv4Addr::UNSPECIFIED
    } else {
        match request.new_ip.parse() {
            Ok(ip) => ip,
            Err(_) => {
                return Ok(warp::reply::json(&AddressResponse {
                    success: false,
                    message: format!("Invalid IPv4 address: {}", request.new_ip),
                    result: None,
                }));
            }
        }
    };

    let board = match state.read().await.boards.get(&request.mac_address) {
        Some(board) => board.clone(),
        None => {
            return Ok(warp::reply::json(&AddressResponse {
                success: false,
                message: format!(
                    "Board {} not known; run a discovery first",
                    request.mac_address
                ),
                result: None,
            }));
        }
    };

    let result = tokio::task::spawn_blocking(move || {
        let interface = interfaces::by_index(request.interface_index)?;
        protocol::set_address(&interface, &board, new_ip, DebugDump::None)
    })
    .await;

    let response = match result {
        Ok(Ok(result)) => AddressResponse {
            success: true,
            message: "Set-address packet sent; rediscover after the settling delay".to_string(),
            result: Some(result),
        },
        Ok(Err(e)) => {
            error!("Set-address failed: {}", e);
            AddressResponse {
                success: false,
                message: format!("Set-address failed: {}", e),
                result: None,
            }
        }
        Err(e) => {
            error!("Set-address task failed: {}", e);
            AddressResponse {
                success: false,
                message: "Internal task failure".to_string(),
                result: None,
            }
        }
    };

    Ok(warp::reply::json(&response))
}
