use async_trait::async_trait;

/// Source of an account's current sequence number as the ledger sees it
#[async_trait]
pub trait AccountSequenceProvider: Send + Sync {
    async fn current_sequence(&self, account: &str) -> Result<u64, SequenceError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SequenceError {
    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("sequence query failed: {0}")]
    QueryFailed(String),
}
