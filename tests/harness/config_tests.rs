use std::fs;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tempfile::tempdir;

use profile_harness::bluetooth::Address;
use profile_harness::config::{ConfigError, DeviceConfig, DeviceKind, HarnessConfig, LogLevel};

#[test]
fn test_config_save_load() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nested").join("config.json");

    let mut config = HarnessConfig::default();
    config.sequencer.mtu = 247;
    config.sequencer.scan_timeout = Duration::from_millis(2500);
    config.system.log_level = LogLevel::Debug;
    config.system.debug_categories = vec!["sequencer".to_string()];
    config.testbed.devices[1] = DeviceConfig::new("ref", DeviceKind::SimulatedStack)
        .with_address("C0:11:22:33:44:55".parse::<Address>().unwrap());

    config.save_to_path(&config_path).expect("Failed to save configuration");
    let loaded = HarnessConfig::load_from_path(&config_path).expect("Failed to load configuration");

    assert_eq!(loaded, config);
}

#[test]
fn test_missing_file_yields_defaults() {
    let temp_dir = tempdir().unwrap();
    let config = HarnessConfig::load_from_path(&temp_dir.path().join("absent.json")).unwrap();
    assert_eq!(config, HarnessConfig::default());
}

#[test]
fn test_invalid_json_is_a_parse_error() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.json");
    fs::write(&config_path, "{ not json").unwrap();

    let result = HarnessConfig::load_from_path(&config_path);
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_unknown_debug_category_fails_validation() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.json");
    fs::write(&config_path, r#"{"system": {"debug_categories": ["radio"]}}"#).unwrap();

    match HarnessConfig::load_from_path(&config_path) {
        Err(ConfigError::ValidationFailed(field, _)) => assert_eq!(field, "system.debug_categories"),
        other => panic!("expected a validation failure, got {:?}", other),
    }
}

#[test]
fn test_invalid_config_is_not_saved() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.json");
    let mut config = HarnessConfig::default();
    config.testbed.devices.clear();

    assert!(config.save_to_path(&config_path).is_err());
    assert!(!config_path.exists());
}
