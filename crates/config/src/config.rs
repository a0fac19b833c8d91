//! Core configuration structures for the transaction submitter

use serde::{Deserialize, Serialize};
use tx_submitter_ratelimit::BackoffPolicy;
use tx_submitter_types::{SubmissionMode, PUBLIC_NETWORK_PASSPHRASE, TEST_NETWORK_PASSPHRASE};

pub const LOCAL_NETWORK_PASSPHRASE: &str = "Standalone Network ; February 2017";

/// Main submitter configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitterConfig {
    /// Network and logging settings
    #[serde(default)]
    pub network: NetworkConfig,

    /// Remote gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Submission retry policy
    #[serde(default)]
    pub submission: SubmissionConfig,

    /// Polling cadence for pending transactions
    #[serde(default)]
    pub polling: PollingConfig,
}

/// Network environment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Environment type (mainnet, testnet, local)
    pub environment: Environment,

    /// Overrides the environment's default passphrase
    #[serde(default)]
    pub network_passphrase: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,

    /// Enable metrics collection
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

impl NetworkConfig {
    /// Effective network passphrase
    pub fn passphrase(&self) -> &str {
        match &self.network_passphrase {
            Some(passphrase) => passphrase,
            None => self.environment.default_passphrase(),
        }
    }
}

/// Environment types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Mainnet,
    Testnet,
    Local,
}

impl Environment {
    pub fn default_passphrase(&self) -> &'static str {
        match self {
            Environment::Mainnet => PUBLIC_NETWORK_PASSPHRASE,
            Environment::Testnet => TEST_NETWORK_PASSPHRASE,
            Environment::Local => LOCAL_NETWORK_PASSPHRASE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Plain,
}

/// Request pacing towards the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Sustained request rate towards the gateway
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Requests allowed in a burst above the sustained rate
    #[serde(default = "default_burst")]
    pub burst: u32,
}

/// Submission retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionConfig {
    /// Mode used by `submit_default`
    #[serde(default)]
    pub default_mode: SubmissionMode,

    /// Maximum sends of one envelope (first attempt included)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Time bound given to rebuilt envelopes, in seconds from now
    #[serde(default = "default_envelope_validity_secs")]
    pub envelope_validity_secs: u64,

    /// Delay schedule between attempts
    #[serde(default)]
    pub backoff: BackoffPolicy,
}

/// Polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Delay between lookups of a pending transaction
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,

    /// How long to poll an envelope that has no max time
    #[serde(default = "default_max_poll_duration_secs")]
    pub max_poll_duration_secs: u64,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_requests_per_second() -> u32 {
    10
}

fn default_burst() -> u32 {
    20
}

fn default_max_attempts() -> u32 {
    5
}

fn default_envelope_validity_secs() -> u64 {
    300 // 5 minutes
}

fn default_poll_interval_ms() -> u64 {
    1000 // 1 second
}

fn default_max_poll_duration_secs() -> u64 {
    120 // 2 minutes
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Testnet,
            network_passphrase: None,
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_enabled: default_true(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            burst: default_burst(),
        }
    }
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            default_mode: SubmissionMode::default(),
            max_attempts: default_max_attempts(),
            envelope_validity_secs: default_envelope_validity_secs(),
            backoff: BackoffPolicy::default(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            max_poll_duration_secs: default_max_poll_duration_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SubmitterConfig::default();
        assert_eq!(config.network.environment, Environment::Testnet);
        assert_eq!(config.network.passphrase(), TEST_NETWORK_PASSPHRASE);
        assert_eq!(config.submission.max_attempts, 5);
        assert_eq!(config.submission.default_mode, SubmissionMode::Sync);
        assert_eq!(config.polling.interval_ms, 1000);
    }

    #[test]
    fn test_passphrase_override() {
        let network = NetworkConfig {
            environment: Environment::Mainnet,
            network_passphrase: Some("Private Net".to_string()),
            ..Default::default()
        };
        assert_eq!(network.passphrase(), "Private Net");

        let network = NetworkConfig {
            environment: Environment::Local,
            ..Default::default()
        };
        assert_eq!(network.passphrase(), LOCAL_NETWORK_PASSPHRASE);
    }
}
