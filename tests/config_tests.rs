use agenda_edge_rs::config::{ConfigError, DeviceConfig};
use serial_test::serial;
use std::env;
use std::time::Duration;

const VARS: &[&str] = &[
    "AGENDA_SERVER_HOST",
    "AGENDA_SERVER_PORT",
    "AGENDA_UPLOAD_PATH",
    "AGENDA_CONNECT_TIMEOUT_UNITS",
    "AGENDA_POLL_INTERVAL_MS",
    "AGENDA_REPLY_TIMEOUT_MS",
    "AGENDA_CHUNK_SIZE",
    "AGENDA_RESPONSE_CAPACITY",
    "AGENDA_STATUS_HOLD_MS",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_defaults_without_environment() {
    clear_env();
    let config = DeviceConfig::load().unwrap();
    assert_eq!(config, DeviceConfig::default());
}

#[test]
#[serial]
fn test_environment_overrides() {
    clear_env();
    env::set_var("AGENDA_SERVER_HOST", "10.0.0.5");
    env::set_var("AGENDA_SERVER_PORT", "8080");
    env::set_var("AGENDA_UPLOAD_PATH", "/voice");
    env::set_var("AGENDA_POLL_INTERVAL_MS", "50");
    env::set_var("AGENDA_CHUNK_SIZE", "256");
    env::set_var("AGENDA_STATUS_HOLD_MS", "500");

    let config = DeviceConfig::load().unwrap();
    clear_env();

    assert_eq!(config.authority(), "10.0.0.5:8080");
    assert_eq!(config.upload_path, "/voice");
    assert_eq!(config.poll_interval, Duration::from_millis(50));
    assert_eq!(config.connect_budget(), Duration::from_secs(5));
    assert_eq!(config.chunk_size, 256);
    assert_eq!(config.status_hold, Duration::from_millis(500));
    assert_eq!(config.response_capacity, 512);
}

#[test]
#[serial]
fn test_unparseable_value() {
    clear_env();
    env::set_var("AGENDA_SERVER_PORT", "not-a-port");

    let result = DeviceConfig::load();
    clear_env();

    match result {
        Err(ConfigError::InvalidValue { var, .. }) => assert_eq!(var, "AGENDA_SERVER_PORT"),
        other => panic!("expected invalid port, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_zero_chunk_size_is_rejected() {
    clear_env();
    env::set_var("AGENDA_CHUNK_SIZE", "0");

    let result = DeviceConfig::load();
    clear_env();

    assert!(matches!(
        result,
        Err(ConfigError::InvalidValue { ref var, .. }) if var == "AGENDA_CHUNK_SIZE"
    ));
}
