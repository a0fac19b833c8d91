//! Integration tests for the config crate

use std::io::Write;
use tempfile::NamedTempFile;
use tx_submitter_config::{
    validate_config, ConfigError, ConfigLoader, Environment, LogFormat, LOCAL_NETWORK_PASSPHRASE,
};
use tx_submitter_ratelimit::BackoffPolicy;
use tx_submitter_types::{SubmissionMode, PUBLIC_NETWORK_PASSPHRASE};

fn preset(name: &str) -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../config")
        .join(name)
}

#[test]
fn test_load_mainnet_config() {
    let config = ConfigLoader::from_file(&preset("mainnet.toml"))
        .expect("Failed to load mainnet config");

    assert_eq!(config.network.environment, Environment::Mainnet);
    assert_eq!(config.network.passphrase(), PUBLIC_NETWORK_PASSPHRASE);
    assert!(validate_config(&config).is_ok());
}

#[test]
fn test_load_testnet_config() {
    let config = ConfigLoader::from_file(&preset("testnet.toml"))
        .expect("Failed to load testnet config");

    assert_eq!(config.network.environment, Environment::Testnet);
    assert_eq!(config.network.log_level, "debug");
    assert!(matches!(
        config.submission.backoff,
        BackoffPolicy::Linear { .. }
    ));
    assert!(validate_config(&config).is_ok());
}

#[test]
fn test_load_local_config() {
    let config = ConfigLoader::from_file(&preset("local.toml"))
        .expect("Failed to load local config");

    assert_eq!(config.network.environment, Environment::Local);
    assert_eq!(config.network.log_level, "trace");
    assert_eq!(config.network.log_format, LogFormat::Plain);
    assert_eq!(config.network.passphrase(), LOCAL_NETWORK_PASSPHRASE);
    assert_eq!(config.submission.default_mode, SubmissionMode::Async);
    assert!(validate_config(&config).is_ok());
}

#[test]
fn test_yaml_file_roundtrip_through_builder() {
    let yaml = r#"
network:
  environment: testnet
gateway:
  burst: 3
polling:
  interval_ms: 50
"#;
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    let config = ConfigLoader::builder()
        .add_file(file.path(), true)
        .build()
        .unwrap();
    assert_eq!(config.gateway.burst, 3);
    assert_eq!(config.polling.interval_ms, 50);
    assert!(validate_config(&config).is_ok());
}

#[test]
fn test_invalid_file_fails_validation() {
    let toml = r#"
[network]
environment = "testnet"
log_level = "loud"

[gateway]
requests_per_second = 0

[polling]
interval_ms = 0
"#;
    let mut file: NamedTempFile = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(toml.as_bytes()).unwrap();

    let config = ConfigLoader::from_file(file.path()).unwrap();
    match validate_config(&config) {
        Err(ConfigError::ValidationError(message)) => {
            assert!(message.contains("network.log_level"));
            assert!(message.contains("polling.interval_ms"));
            assert!(message.contains("gateway.requests_per_second"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn test_malformed_toml_is_parse_error() {
    let result = ConfigLoader::from_toml("[network\nenvironment = ");
    assert!(matches!(result, Err(ConfigError::TomlError(_))));
}
