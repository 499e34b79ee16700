//! Progress WebSocket route
//!
//! Subscribers on /ws/progress receive every FlashEvent the server emits,
//! serialized as JSON, for the lifetime of the connection.

use futures_util::{SinkExt, StreamExt};
use log::debug;
use std::sync::Arc;
use tokio::sync::RwLock;
use warp::Filter;
use warp::ws::{Message, WebSocket};

use crate::server::app::ServerState;
use crate::server::routes::with_server_state;

/// WS /ws/progress - stream erase/program progress events
pub fn create_progress_route(
    state: Arc<RwLock<ServerState>>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("ws")
        .and(warp::path("progress"))
        .and(warp::path::end())
        .and(warp::ws())
        .and(with_server_state(state))
        .map(|ws: warp::ws::Ws, state: Arc<RwLock<ServerState>>| {
            ws.on_upgrade(move |socket| progress_session(socket, state))
        })
}

async fn progress_session(socket: WebSocket, state: Arc<RwLock<ServerState>>) {
    let mut rx = state.read().await.progress_tx.subscribe();
    let (mut ws_tx, mut ws_rx) = socket.split();

    debug!("progress WebSocket subscriber connected");

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(json) => {
                        if ws_tx.send(Message::text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("progress subscriber lagged, skipped {} events", skipped);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            incoming = ws_rx.next() => {
                match incoming {
                    // Clients only listen; anything but close is ignored
                    Some(Ok(msg)) if msg.is_close() => break,
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }

    debug!("progress WebSocket subscriber disconnected");
}
