use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{LedgerEntry, Rejection, ResultCode, TransactionHash};

/// Largest page the `get_transactions` query serves
pub const MAX_PAGE_LIMIT: u32 = 200;

/// Page size used when the caller does not pick one
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Immediate status returned by an asynchronous submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AsyncStatus {
    Pending,
    Duplicate,
    Error,
    TryAgainLater,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsyncSubmitResponse {
    pub status: AsyncStatus,
    pub hash: TransactionHash,
    /// Present when `status` is `ERROR`
    #[serde(default)]
    pub diagnostic: Option<Rejection>,
}

/// Answer of a blocking submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SyncSubmitResponse {
    /// 200: applied to a ledger
    Included(LedgerEntry),
    /// 400: rejected with a result code
    Rejected(Rejection),
    /// 504: the gateway gave up waiting; the envelope may still land
    Timeout { hash: TransactionHash },
}

/// Lookup of a transaction by hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransactionLookup {
    /// 404: not in any ledger the gateway knows about
    NotFound,
    Included(LedgerEntry),
    /// Definitive failure record, e.g. `tx_too_late`
    Failed(Rejection),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("page limit must be between 1 and {max}, got {limit}")]
    InvalidLimit { limit: u32, max: u32 },

    #[error("start ledger and cursor are mutually exclusive")]
    ConflictingStart,

    #[error("either a start ledger or a cursor is required")]
    MissingStart,
}

/// Parameters of the paginated `get_transactions` query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetTransactionsRequest {
    pub start_ledger: Option<u32>,
    pub cursor: Option<String>,
    pub limit: u32,
}

impl GetTransactionsRequest {
    pub fn from_ledger(start_ledger: u32) -> Self {
        Self {
            start_ledger: Some(start_ledger),
            cursor: None,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }

    pub fn from_cursor(cursor: impl Into<String>) -> Self {
        Self {
            start_ledger: None,
            cursor: Some(cursor.into()),
            limit: DEFAULT_PAGE_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn validate(&self) -> Result<(), PaginationError> {
        if self.limit == 0 || self.limit > MAX_PAGE_LIMIT {
            return Err(PaginationError::InvalidLimit {
                limit: self.limit,
                max: MAX_PAGE_LIMIT,
            });
        }
        match (&self.start_ledger, &self.cursor) {
            (Some(_), Some(_)) => Err(PaginationError::ConflictingStart),
            (None, None) => Err(PaginationError::MissingStart),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Success,
    Failed,
}

/// One transaction as listed by `get_transactions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub hash: TransactionHash,
    pub status: TransactionStatus,
    pub ledger: u32,
    /// Index of the transaction within its ledger, starting at 1
    pub application_order: u32,
    pub fee_bump: bool,
    /// Ledger close time (Unix seconds)
    pub created_at: u64,
    #[serde(default)]
    pub result_code: Option<ResultCode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPage {
    pub transactions: Vec<TransactionRecord>,
    pub latest_ledger: u32,
    pub latest_ledger_close_time: u64,
    pub oldest_ledger: u32,
    pub oldest_ledger_close_time: u64,
    /// Opaque position of the last record; pass it back to continue
    pub cursor: String,
}
