//! Integration tests for configuration loading

use std::io::Write;
use tickwatch::config::Config;
use tickwatch::telemetry::LogFormat;

#[test]
fn test_example_config_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml.example");
    let config = tokio_test::assert_ok!(Config::load(path));

    assert_eq!(config.catalog.base_url, "http://localhost:8000");
    assert_eq!(config.stream.base_url, "ws://localhost:8000/ws");
    assert!(!config.stream.reconnect.enabled);
    assert_eq!(config.aggregator.history_capacity, 100);
    assert_eq!(config.telemetry.log_format, LogFormat::Pretty);
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        [stream]
        base_url = "ws://quotes.example:9000/ws"

        [stream.reconnect]
        enabled = true

        [aggregator]
        history_capacity = 20
        "#
    )
    .unwrap();

    let config = tokio_test::assert_ok!(Config::load(file.path()));
    assert_eq!(config.stream.base_url, "ws://quotes.example:9000/ws");
    assert!(config.stream.reconnect.enabled);
    assert_eq!(config.stream.reconnect.max_attempts, 5);
    assert_eq!(config.aggregator.history_capacity, 20);
    assert_eq!(config.catalog.timeout_secs, 10);
}

#[test]
fn test_invalid_file_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[aggregator]\nevent_queue_capacity = 0").unwrap();
    tokio_test::assert_err!(Config::load(file.path()));

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[telemetry]\nlog_format = \"xml\"").unwrap();
    tokio_test::assert_err!(Config::load(file.path()));
}
