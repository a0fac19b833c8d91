use async_trait::async_trait;
use std::time::Duration;
use tx_submitter_types::{
    AsyncSubmitResponse, GetTransactionsRequest, SyncSubmitResponse, TransactionEnvelope,
    TransactionHash, TransactionLookup, TransactionPage,
};

/// Remote submission and query API of the ledger network
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Hand the envelope over and return at once with a status
    async fn submit_async(
        &self,
        envelope: &TransactionEnvelope,
    ) -> Result<AsyncSubmitResponse, GatewayError>;

    /// Block until inclusion, rejection or the gateway's own timeout
    async fn submit_sync(
        &self,
        envelope: &TransactionEnvelope,
    ) -> Result<SyncSubmitResponse, GatewayError>;

    /// Look a transaction up by hash
    async fn transaction(&self, hash: &TransactionHash) -> Result<TransactionLookup, GatewayError>;

    /// One page of the transaction history
    async fn get_transactions(
        &self,
        request: &GetTransactionsRequest,
    ) -> Result<TransactionPage, GatewayError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// 429; `retry_after` carries the server hint when one was sent
    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("network error: {0}")]
    Network(String),

    #[error("timeout: {0}")]
    Timeout(String),

    /// 503 and similar
    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Raised before sending: the envelope's max time passed while the
    /// request waited, so nothing reached the ledger
    #[error("envelope expired at {max_time} before it could be sent")]
    EnvelopeExpired { max_time: u64 },
}

impl GatewayError {
    /// Whether repeating the same request later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GatewayError::RateLimited { .. }
                | GatewayError::Network(_)
                | GatewayError::Timeout(_)
                | GatewayError::Unavailable(_)
        )
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            GatewayError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Short label for logs and metrics
    pub fn reason(&self) -> &'static str {
        match self {
            GatewayError::RateLimited { .. } => "rate_limited",
            GatewayError::Network(_) => "network",
            GatewayError::Timeout(_) => "timeout",
            GatewayError::Unavailable(_) => "unavailable",
            GatewayError::InvalidResponse(_) => "invalid_response",
            GatewayError::InvalidRequest(_) => "invalid_request",
            GatewayError::EnvelopeExpired { .. } => "expired",
        }
    }
}
