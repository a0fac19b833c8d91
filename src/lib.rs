//! Transaction submission client for a ledger network
//!
//! Re-exports the workspace crates under one roof:
//!
//! - [`types`]: envelopes, signing, result codes, outcomes
//! - [`submitter`]: the [`SubmissionCoordinator`] and its collaborators
//! - [`ratelimit`]: backoff policies and request throttling
//! - [`config`]: layered configuration loading and validation
//! - [`metrics`]: Prometheus counters and tracing setup
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tx_submitter::{
//!     ConfigLoader, MockLedgerGateway, Network, StaticSequenceProvider, SubmissionCoordinator,
//!     SubmissionMode, SystemClock,
//! };
//!
//! # async fn run(envelope: tx_submitter::TransactionEnvelope) -> anyhow::Result<()> {
//! let config = ConfigLoader::from_file(std::path::Path::new("config/testnet.toml"))?;
//! tx_submitter::init_logging(&config)?;
//!
//! let clock = Arc::new(SystemClock);
//! let gateway = Arc::new(MockLedgerGateway::new(
//!     Network::new(config.network.passphrase()),
//!     clock.clone(),
//! ));
//! let coordinator = SubmissionCoordinator::from_config(
//!     &config,
//!     gateway,
//!     Arc::new(StaticSequenceProvider::new()),
//!     clock,
//! );
//! let outcome = coordinator.submit(&envelope, SubmissionMode::Sync).await?;
//! println!("{}", outcome.kind());
//! # Ok(())
//! # }
//! ```

pub use tx_submitter_config as config;
pub use tx_submitter_core as submitter;
pub use tx_submitter_metrics as metrics;
pub use tx_submitter_ratelimit as ratelimit;
pub use tx_submitter_types as types;

pub use tx_submitter_config::{validate_config, ConfigLoader, LogFormat, SubmitterConfig};
pub use tx_submitter_core::{
    AccountSequenceProvider, Clock, CoordinatorConfig, GatewayError, LedgerGateway, ManualClock,
    MockLedgerGateway, RateLimitedGateway, SequenceError, StaticSequenceProvider, SubmitError,
    SubmissionCoordinator, SystemClock, TransactionHistory,
};
pub use tx_submitter_metrics::{MetricsCollector, TracingError};
pub use tx_submitter_ratelimit::BackoffPolicy;
pub use tx_submitter_types::{
    EnvelopeBuilder, EnvelopeSigner, FeeBumpBuilder, Network, Operation, Rejection, ResultCode,
    SubmissionMode, SubmissionOutcome, SubmissionReport, SubmissionState, TimeBounds,
    TransactionEnvelope, TransactionHash,
};

/// Install the log subscriber described by the `network` section
pub fn init_logging(config: &SubmitterConfig) -> Result<(), TracingError> {
    tx_submitter_metrics::init_tracing(
        &config.network.log_level,
        config.network.log_format == LogFormat::Json,
    )
}
