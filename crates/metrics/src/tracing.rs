use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tx_submitter_types::{SubmissionMode, TransactionHash};

/// Filter used when `RUST_LOG` is unset and no level is configured
pub const DEFAULT_FILTER: &str = "info,tx_submitter=debug";

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `log_level`; an empty `log_level` falls back to
/// [`DEFAULT_FILTER`]. `json` selects structured output over the plain
/// human-readable format.
pub fn init_tracing(log_level: &str, json: bool) -> Result<(), TracingError> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| build_filter(log_level))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if json {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_level(true)
                    .json(),
            )
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_level(true))
            .try_init()
    };

    result.map_err(|e| TracingError::InitError(e.to_string()))
}

fn build_filter(log_level: &str) -> Result<EnvFilter, TracingError> {
    let directive = match log_level.trim() {
        "" => DEFAULT_FILTER.to_string(),
        level => format!("{level},tx_submitter={level}"),
    };
    EnvFilter::try_new(&directive).map_err(|e| TracingError::InvalidFilter(e.to_string()))
}

/// Correlation ID tying together every log line of one logical submission,
/// including its rebuilt successors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(uuid::Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Span context for one submission flow
#[derive(Debug, Clone)]
pub struct SubmissionSpan {
    pub correlation_id: CorrelationId,
    pub hash: TransactionHash,
    pub mode: SubmissionMode,
}

impl SubmissionSpan {
    pub fn new(hash: TransactionHash, mode: SubmissionMode) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            hash,
            mode,
        }
    }

    /// Keep the correlation ID of an earlier attempt, e.g. after a rebuild
    pub fn with_correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "submission",
            correlation_id = %self.correlation_id,
            hash = %self.hash,
            mode = %self.mode,
        )
    }
}

/// Tracing error types
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("tracing initialization error: {0}")]
    InitError(String),
    #[error("invalid log filter: {0}")]
    InvalidFilter(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_id_generation() {
        let id1 = CorrelationId::new();
        let id2 = CorrelationId::new();

        assert_ne!(id1, id2);
        assert_eq!(id1.as_str().len(), 36);
    }

    #[test]
    fn test_submission_span_keeps_correlation() {
        let hash = TransactionHash::from_bytes([7u8; 32]);
        let first = SubmissionSpan::new(hash.clone(), SubmissionMode::Sync);
        let rebuilt = SubmissionSpan::new(hash, SubmissionMode::Async)
            .with_correlation_id(first.correlation_id);

        assert_eq!(first.correlation_id, rebuilt.correlation_id);
        assert_eq!(rebuilt.mode, SubmissionMode::Async);
    }

    #[test]
    fn test_build_filter() {
        assert!(build_filter("").is_ok());
        assert!(build_filter("debug").is_ok());
        assert!(build_filter("warn").is_ok());
        assert!(matches!(
            build_filter("verbose"),
            Err(TracingError::InvalidFilter(_))
        ));
    }
}
