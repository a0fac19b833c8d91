use tx_submitter_types::{EnvelopeError, PaginationError, TransactionHash};

use crate::{GatewayError, SequenceError};

/// Failures that carry no ledger verdict.
///
/// Anything the ledger decided (rejections, expiry, pending) is a
/// [`SubmissionOutcome`](tx_submitter_types::SubmissionOutcome), never an error.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("sequence error: {0}")]
    Sequence(#[from] SequenceError),

    #[error("envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    #[error("pagination error: {0}")]
    Pagination(#[from] PaginationError),

    #[error("envelope expired at {max_time}, now {now}; it was not sent")]
    EnvelopeExpired { max_time: u64, now: u64 },

    #[error("gave up after {attempts} attempts without an answer")]
    RetriesExhausted { attempts: u32 },

    #[error("report does not allow a rebuild: {0}")]
    NotRebuildable(String),

    #[error("report is for {report}, envelope hashes to {envelope}")]
    ReportMismatch {
        report: TransactionHash,
        envelope: TransactionHash,
    },

    #[error("sequence did not advance: rejected {rejected}, next would be {next}")]
    SequenceNotAdvanced { rejected: u64, next: u64 },
}
