//! Logging initialization for the CLI and server

use anyhow::Result;
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::io::Write;

/// Initialize stderr logging for the CLI
pub fn init_cli_logging(verbose: u8, quiet: bool) -> Result<()> {
    let level = match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    };

    Builder::from_default_env()
        .target(Target::Stderr)
        .filter_level(level)
        .format_timestamp_secs()
        .format_module_path(false)
        .init();

    #[cfg(debug_assertions)]
    log_panics::init();

    log::debug!("hpsdrflash logging initialized with level: {:?}", level);
    Ok(())
}

/// Initialize timestamped stdout logging for the server
pub fn init_server_logging(level: Option<LevelFilter>) -> Result<()> {
    let level = level.unwrap_or(LevelFilter::Info);

    Builder::from_default_env()
        .target(Target::Stdout)
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}: {}",
                buf.timestamp(),
                record.level(),
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        })
        .init();

    // Always capture panics in server logs
    log_panics::init();

    log::info!("hpsdrflash server logging initialized with level: {:?}", level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_selection() {
        let level = match (true, 0) {
            (true, _) => LevelFilter::Error,
            (false, 0) => LevelFilter::Info,
            (false, 1) => LevelFilter::Debug,
            (false, _) => LevelFilter::Trace,
        };
        assert_eq!(level, LevelFilter::Error);

        let level = match (false, 2) {
            (true, _) => LevelFilter::Error,
            (false, 0) => LevelFilter::Info,
            (false, 1) => LevelFilter::Debug,
            (false, _) => LevelFilter::Trace,
        };
        assert_eq!(level, LevelFilter::Trace);
    }
}
