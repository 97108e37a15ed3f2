use biostream::{SessionConfig, SessionError};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "address": "00:07:80:4D:2E:76", "rate": 2000, "grace_period_ms": 250 }}"#
    )
    .unwrap();

    let config = SessionConfig::from_file(file.path()).unwrap();
    assert_eq!(config.target_address(), Some("00:07:80:4D:2E:76"));
    assert_eq!(config.rate, Some(2000));
    assert_eq!(config.grace_period(), Duration::from_millis(250));
    assert_eq!(config.drain_interval(), Duration::from_millis(100));
}

#[test]
fn test_empty_object_is_default() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{{}}").unwrap();

    let config = SessionConfig::from_file(file.path()).unwrap();
    assert_eq!(config, SessionConfig::default());
}

#[test]
fn test_malformed_file_is_invalid_configuration() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{{ \"rate\": ").unwrap();

    let result = SessionConfig::from_file(file.path());
    assert!(matches!(result, Err(SessionError::InvalidConfiguration(_))));
}

#[test]
fn test_missing_file_is_invalid_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let result = SessionConfig::from_file(dir.path().join("missing.json"));

    assert!(matches!(result, Err(SessionError::InvalidConfiguration(_))));
}
