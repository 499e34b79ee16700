//! Firmware flash routes (multipart upload + status polling)

use anyhow;
use bytes::Buf;
use futures_util::TryStreamExt;
use log::{error, info};
use std::sync::Arc;
use tokio::sync::RwLock;
use warp::Filter;

use crate::firmware::FirmwareImage;
use crate::models::FlashResponse;
use crate::server::app::ServerState;
use crate::server::routes::with_server_state;
use crate::server::services::FlashService;

/// Create flash routes: POST /api/v1/flash and GET /api/v1/flash/{id}
pub fn create_flash_routes(
    state: Arc<RwLock<ServerState>>,
    max_upload: usize,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let submit = warp::path("api")
        .and(warp::path("v1"))
        .and(warp::path("flash"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::multipart::form().max_length(max_upload as u64))
        .and(with_server_state(state.clone()))
        .and_then(flash_submit_handler);

    let status = warp::path("api")
        .and(warp::path("v1"))
        .and(warp::path("flash"))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::get())
        .and(with_server_state(state))
        .and_then(flash_status_handler);

    submit.or(status)
}

/// Handler for POST /api/v1/flash - accept an RBF upload and start the
/// erase + program sequence in the background
async fn flash_submit_handler(
    form: warp::multipart::FormData,
    state: Arc<RwLock<ServerState>>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let parsed = match parse_flash_form(form).await {
        Ok(parsed) => parsed,
        Err(e) => {
            error!("Failed to parse flash form: {}", e);
            return Ok(warp::reply::json(&FlashResponse {
                success: false,
                message: format!("Failed to parse multipart form: {}", e),
                flash_id: None,
            }));
        }
    };

    info!(
        "Flash submitted for {}: {} ({:.1} KB)",
        parsed.mac_address,
        parsed.file_name,
        parsed.data.len() as f64 / 1024.0
    );

    let image = FirmwareImage::from_bytes(parsed.data, parsed.file_name);
    let service = FlashService::new(state);

    let response = match service
        .start_flash(parsed.interface_index, &parsed.mac_address, image)
        .await
    {
        Ok(flash_id) => FlashResponse {
            success: true,
            message: "Flash started; watch /ws/progress".to_string(),
            flash_id: Some(flash_id),
        },
        Err(e) => {
            error!("Flash submission failed: {}", e);
            FlashResponse {
                success: false,
                message: format!("Flash submission failed: {}", e),
                flash_id: None,
            }
        }
    };

    Ok(warp::reply::json(&response))
}

/// Handler for GET /api/v1/flash/{id}
async fn flash_status_handler(
    flash_id: String,
    state: Arc<RwLock<ServerState>>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let state = state.read().await;
    match state.flash_operations.get(&flash_id) {
        Some(status) => Ok(warp::reply::json(status)),
        None => Ok(warp::reply::json(&FlashResponse {
            success: false,
            message: format!("No flash operation with id {}", flash_id),
            flash_id: None,
        })),
    }
}

struct ParsedFlashForm {
    interface_index: u32,
    mac_address: String,
    file_name: String,
    data: Vec<u8>,
}

/// Collect a multipart part into bytes
async fn part_bytes(part: warp::multipart::Part) -> Result<Vec<u8>, anyhow::Error> {
    part.stream()
        .try_fold(Vec::new(), |mut acc, chunk| async move {
            acc.extend_from_slice(chunk.chunk());
            Ok(acc)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Error reading multipart part: {}", e))
}

/// Parse the flash form: `interface_index`, `mac_address` and the `rbf`
/// file part
async fn parse_flash_form(
    mut form: warp::multipart::FormData,
) -> Result<ParsedFlashForm, anyhow::Error> {
    let mut interface_index: Option<u32> = None;
    let mut mac_address = String::new();
    let mut file_name = "firmware.rbf".to_string();
    let mut data: Option<Vec<u8>> = None;

    while let Some(part) = form
        .try_next()
        .await
        .map_err(|e| anyhow::anyhow!("Error reading multipart: {}", e))?
    {
        match part.name() {
            "interface_index" => {
                let text = String::from_utf8(part_bytes(part).await?)
                    .map_err(|e| anyhow::anyhow!("Invalid UTF-8 in interface_index: {}", e))?;
                interface_index = Some(
                    text.trim()
                        .parse()
                        .map_err(|e| anyhow::anyhow!("Invalid interface_index: {}", e))?,
                );
            }
            "mac_address" => {
                mac_address = String::from_utf8(part_bytes(part).await?)
                    .map_err(|e| anyhow::anyhow!("Invalid UTF-8 in mac_address: {}", e))?
                    .trim()
                    .to_string();
            }
            "rbf" => {
                if let Some(name) = part.filename() {
                    file_name = name.to_string();
                }
                data = Some(part_bytes(part).await?);
            }
            other => {
                log::debug!("ignoring multipart field '{}'", other);
            }
        }
    }

    let interface_index =
        interface_index.ok_or_else(|| anyhow::anyhow!("Missing interface_index in form data"))?;
    if mac_address.is_empty() {
        return Err(anyhow::anyhow!("Missing mac_address in form data"));
    }
    let data = data.ok_or_else(|| anyhow::anyhow!("Missing rbf file in form data"))?;
    if data.is_empty() {
        return Err(anyhow::anyhow!("Uploaded RBF is empty"));
    }

    Ok(ParsedFlashForm {
        interface_index,
        mac_address,
        file_name,
        data,
    })
}
