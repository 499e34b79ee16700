//! Host interface enumeration route

use log::error;
use serde_json::json;
use warp::Filter;

use crate::interfaces;

/// GET /api/v1/interfaces - list host network interfaces
pub fn create_interface_routes()
-> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("api")
        .and(warp::path("v1"))
        .and(warp::path("interfaces"))
        .and(warp::path::end())
        .and(warp::get())
        .and_then(list_interfaces_handler)
}

async fn list_interfaces_handler() -> Result<impl warp::Reply, warp::Rejection> {
    match tokio::task::spawn_blocking(interfaces::enumerate).await {
        Ok(Ok(list)) => Ok(warp::reply::json(&json!({
            "success": true,
            "interfaces": list,
        }))),
        Ok(Err(e)) => {
            error!("Interface enumeration failed: {}", e);
            Ok(warp::reply::json(&json!({
                "success": false,
                "message": format!("Interface enumeration failed: {}", e),
            })))
        }
        Err(e) => {
            error!("Interface enumeration task failed: {}", e);
            Ok(warp::reply::json(&json!({
                "success": false,
                "message": "Internal task failure",
            })))
        }
    }
}
