//! HTTP request logging middleware

/// Create a request logging filter using warp's built-in logging
pub fn with_request_logging() -> warp::filters::log::Log<impl Fn(warp::filters::log::Info) + Clone>
{
    warp::log::custom(|info| {
        let status = info.status();
        let elapsed_ms = info.elapsed().as_millis();
        let remote_addr = info
            .remote_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        log::info!(
            "{} {} {} - {} {}ms - {}",
            chrono::Local::now().format("%H:%M:%S"),
            info.method(),
            info.path(),
            status,
            elapsed_ms,
            remote_addr
        );

        if status.is_client_error() || status.is_server_error() {
            log::warn!(
                "request failed: {} {} from {}",
                info.method(),
                info.path(),
                remote_addr
            );
        }
    })
}
