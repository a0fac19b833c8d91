//! Metrics and tracing for the transaction submitter
//!
//! Counters live in the process-wide Prometheus registry and are recorded
//! through [`MetricsCollector`]; [`init_tracing`] installs the log subscriber.
//!
//! # Example
//!
//! ```no_run
//! use tx_submitter_metrics::{init_tracing, MetricsCollector};
//! use tx_submitter_types::SubmissionMode;
//!
//! init_tracing("info", true).unwrap();
//!
//! let collector = MetricsCollector::new();
//! collector.record_submission(SubmissionMode::Sync);
//! println!("{}", collector.export_metrics().unwrap());
//! ```

pub mod collector;
pub mod metrics;
pub mod tracing;

pub use collector::{MetricsCollector, MetricsError};
pub use tracing::{init_tracing, CorrelationId, SubmissionSpan, TracingError, DEFAULT_FILTER};
