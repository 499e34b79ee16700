//! Unit tests for CLI-facing pieces: settings persistence, firmware image
//! handling, and the debug-dump flag parsing.

use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use tempfile::TempDir;

use hpsdrflash::config::AppConfig;
use hpsdrflash::firmware::{BLOCK_SIZE, FirmwareImage, PAD_BYTE};
use hpsdrflash::protocol::DebugDump;

#[test]
fn settings_survive_a_save_load_cycle() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("hpsdrflash.json");

    let config = AppConfig {
        interface_index: 2,
        select_mac: Some("0:1c:c0:a2:13:1".to_string()),
        rbf_path: Some(PathBuf::from("/firmware/angelia_v2.rbf")),
        new_ip: Some("192.168.1.50".to_string()),
        debug: DebugDump::Dec,
        discovery_delay_secs: 5,
        discovery_wait_ms: 4000,
        erase_timeout_secs: 90,
        server_url: "http://radio-shack:8080".to_string(),
    };
    config.save(&path).unwrap();

    let loaded = AppConfig::load(&path).unwrap();
    assert_eq!(loaded.interface_index, 2);
    assert_eq!(loaded.select_mac.as_deref(), Some("0:1c:c0:a2:13:1"));
    assert_eq!(
        loaded.rbf_path.as_deref(),
        Some(std::path::Path::new("/firmware/angelia_v2.rbf"))
    );
    assert_eq!(loaded.debug, DebugDump::Dec);
    assert_eq!(loaded.discovery_delay_secs, 5);
    assert_eq!(loaded.discovery_wait_ms, 4000);
    assert_eq!(loaded.erase_timeout_secs, 90);
    assert_eq!(loaded.server_url, "http://radio-shack:8080");
}

#[test]
fn save_creates_missing_parent_directories() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("dir").join("settings.json");

    AppConfig::default().save(&path).unwrap();
    assert!(path.is_file());
}

#[test]
fn corrupt_settings_file_is_an_error_not_a_panic() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("settings.json");
    fs::write(&path, "not json {{{").unwrap();

    assert!(AppConfig::load(&path).is_err());
}

#[test]
fn retry_policy_uses_saved_erase_timeout() {
    let config = AppConfig {
        erase_timeout_secs: 120,
        ..AppConfig::default()
    };
    let policy = config.retry_policy();
    assert_eq!(policy.erase_timeout.as_secs(), 120);
}

#[test]
fn firmware_image_from_disk_matches_in_memory() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("test.rbf");
    fs::write(&path, vec![0x12; BLOCK_SIZE + 10]).unwrap();

    let image = FirmwareImage::open(&path).unwrap();
    assert_eq!(image.len(), BLOCK_SIZE + 10);
    assert_eq!(image.blocks(), 2);

    let last = image.block(1).unwrap();
    assert_eq!(&last[..10], &[0x12; 10]);
    assert!(last[10..].iter().all(|&b| b == PAD_BYTE));
}

#[test]
fn debug_dump_flag_parses_all_spellings() {
    assert_eq!(DebugDump::from_str("none").unwrap(), DebugDump::None);
    assert_eq!(DebugDump::from_str("dec").unwrap(), DebugDump::Dec);
    assert_eq!(DebugDump::from_str("decimal").unwrap(), DebugDump::Dec);
    assert_eq!(DebugDump::from_str("HEX").unwrap(), DebugDump::Hex);
    assert!(DebugDump::from_str("verbose").is_err());
}
