//! Configuration Loading Tests
//!
//! - Missing fields take their defaults
//! - Invalid files are rejected before any query runs
//! - Keyed updates are all-or-nothing

use std::fs;

use tempfile::TempDir;
use tvfexec::config::{
    ConfigError, ExecutionConfig, ARROW_BATCH_SIZE_KEY, ARROW_ENABLED_KEY, OUTPUT_BUFFER_KEY,
};
use tvfexec::encoder::EncodingMode;

// =============================================================================
// Helper Functions
// =============================================================================

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("tvfexec.json");
    fs::write(&path, content).unwrap();
    path
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_load_full_config() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"{"arrow_enabled": true, "arrow_batch_size": 512, "output_buffer_frames": 8}"#,
    );
    let config = ExecutionConfig::load(&path).unwrap();
    assert_eq!(config.encoding_mode(), EncodingMode::Arrow);
    assert_eq!(config.arrow_batch_size, 512);
    assert_eq!(config.output_buffer_frames, 8);
}

#[test]
fn test_empty_object_is_default() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "{}");
    assert_eq!(ExecutionConfig::load(&path).unwrap(), ExecutionConfig::default());
}

#[test]
fn test_missing_file_is_read_error() {
    let dir = TempDir::new().unwrap();
    let err = ExecutionConfig::load(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn test_malformed_json_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, r#"{"arrow_enabled": "#);
    assert!(matches!(
        ExecutionConfig::load(&path).unwrap_err(),
        ConfigError::Parse(_)
    ));
}

#[test]
fn test_zero_batch_size_rejected_on_load() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, r#"{"arrow_batch_size": 0}"#);
    let err = ExecutionConfig::load(&path).unwrap_err();
    assert!(err.to_string().contains(ARROW_BATCH_SIZE_KEY));
}

// =============================================================================
// Keyed Settings
// =============================================================================

#[test]
fn test_set_and_get_by_key() {
    let mut config = ExecutionConfig::default();
    config.set(ARROW_ENABLED_KEY, "TRUE").unwrap();
    config.set(ARROW_BATCH_SIZE_KEY, " 3 ").unwrap();
    config.set(OUTPUT_BUFFER_KEY, "2").unwrap();

    assert_eq!(config.get(ARROW_ENABLED_KEY).unwrap(), "true");
    assert_eq!(config.get(ARROW_BATCH_SIZE_KEY).unwrap(), "3");
    assert_eq!(config.get(OUTPUT_BUFFER_KEY).unwrap(), "2");
}

#[test]
fn test_invalid_set_leaves_config_unchanged() {
    let mut config = ExecutionConfig::default();
    config.set(ARROW_BATCH_SIZE_KEY, "42").unwrap();

    for value in ["0", "-1", "many"] {
        let err = config.set(ARROW_BATCH_SIZE_KEY, value).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
    assert_eq!(config.arrow_batch_size, 42);
    assert!(matches!(
        config.set("udtf.arrow.unknown", "1").unwrap_err(),
        ConfigError::UnknownKey(_)
    ));
}

#[test]
fn test_unset_restores_default() {
    let mut config = ExecutionConfig::default();
    config.set(ARROW_ENABLED_KEY, "true").unwrap();
    config.unset(ARROW_ENABLED_KEY).unwrap();
    assert_eq!(config.encoding_mode(), EncodingMode::Row);
    assert!(config.unset("nope").is_err());
}
