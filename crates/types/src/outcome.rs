use serde::{Deserialize, Serialize};

use crate::{Rejection, TransactionHash};

/// How a submission is sent to the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionMode {
    /// Block until the gateway reports inclusion, rejection or its own timeout
    #[default]
    Sync,
    /// Hand the envelope over and return immediately with a status
    Async,
}

impl SubmissionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionMode::Sync => "sync",
            SubmissionMode::Async => "async",
        }
    }
}

impl std::fmt::Display for SubmissionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of a transaction applied to a closed ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub hash: TransactionHash,
    pub ledger: u32,
    pub application_order: u32,
    pub fee_charged: u64,
    /// Ledger close time (Unix seconds)
    pub closed_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingTag {
    /// Accepted for processing
    Pending,
    /// An identical envelope is already in flight
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingStatus {
    pub hash: TransactionHash,
    pub tag: PendingTag,
}

/// Result of one logical submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Success(LedgerEntry),
    Rejected(Rejection),
    /// Accepted but not yet in a ledger; poll the hash to resolve
    Pending(PendingStatus),
    /// The envelope's window closed without a definitive answer
    TimedOut,
    /// Polling of an unbounded envelope stopped; inclusion is still possible
    Unknown,
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionOutcome::Success(_))
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            SubmissionOutcome::Rejected(r) => Some(r),
            _ => None,
        }
    }

    /// Short label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            SubmissionOutcome::Success(_) => "success",
            SubmissionOutcome::Rejected(_) => "rejected",
            SubmissionOutcome::Pending(_) => "pending",
            SubmissionOutcome::TimedOut => "timed_out",
            SubmissionOutcome::Unknown => "unknown",
        }
    }
}

/// Lifecycle of one logical submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    Built,
    Submitted,
    Pending,
    Succeeded,
    Rejected,
    /// The ledger confirmed the envelope can never be applied
    ExpiredConfirmed,
}

impl SubmissionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmissionState::Succeeded | SubmissionState::Rejected | SubmissionState::ExpiredConfirmed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionState::Built => "built",
            SubmissionState::Submitted => "submitted",
            SubmissionState::Pending => "pending",
            SubmissionState::Succeeded => "succeeded",
            SubmissionState::Rejected => "rejected",
            SubmissionState::ExpiredConfirmed => "expired_confirmed",
        }
    }
}

/// Tracking record for one submission, owned by a single coordinator call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollState {
    pub transaction_hash: TransactionHash,
    /// Unix seconds of the first send
    pub submitted_at: u64,
    pub time_bound_max: Option<u64>,
    /// Number of times the envelope was sent
    pub attempt_count: u32,
    /// Number of lookups by hash
    pub poll_count: u32,
}

impl PollState {
    pub fn new(transaction_hash: TransactionHash, submitted_at: u64, time_bound_max: Option<u64>) -> Self {
        Self {
            transaction_hash,
            submitted_at,
            time_bound_max,
            attempt_count: 0,
            poll_count: 0,
        }
    }

    pub fn record_attempt(&mut self) {
        self.attempt_count += 1;
    }

    pub fn record_poll(&mut self) {
        self.poll_count += 1;
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        self.time_bound_max.is_some_and(|max| now > max)
    }
}

/// Outcome of a submission together with the final lifecycle state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReport {
    pub outcome: SubmissionOutcome,
    pub state: SubmissionState,
    pub poll: PollState,
}

impl SubmissionReport {
    pub fn hash(&self) -> &TransactionHash {
        &self.poll.transaction_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResultCode;

    fn hash() -> TransactionHash {
        TransactionHash::from_bytes([1u8; 32])
    }

    #[test]
    fn test_terminal_states() {
        assert!(SubmissionState::Succeeded.is_terminal());
        assert!(SubmissionState::Rejected.is_terminal());
        assert!(SubmissionState::ExpiredConfirmed.is_terminal());
        assert!(!SubmissionState::Pending.is_terminal());
        assert!(!SubmissionState::Submitted.is_terminal());
        assert!(!SubmissionState::Built.is_terminal());
    }

    #[test]
    fn test_poll_state_tracking() {
        let mut state = PollState::new(hash(), 1_000, Some(1_030));
        state.record_attempt();
        state.record_attempt();
        state.record_poll();

        assert_eq!(state.attempt_count, 2);
        assert_eq!(state.poll_count, 1);
        assert!(!state.is_expired_at(1_030));
        assert!(state.is_expired_at(1_031));
    }

    #[test]
    fn test_unbounded_poll_state_never_expires() {
        let state = PollState::new(hash(), 1_000, None);
        assert!(!state.is_expired_at(u64::MAX));
    }

    #[test]
    fn test_outcome_helpers() {
        let rejected = SubmissionOutcome::Rejected(Rejection::new(ResultCode::BadSeq));
        assert_eq!(rejected.kind(), "rejected");
        assert_eq!(rejected.rejection().map(|r| r.code), Some(ResultCode::BadSeq));
        assert!(!rejected.is_success());

        assert_eq!(SubmissionOutcome::TimedOut.kind(), "timed_out");
        assert!(SubmissionOutcome::Unknown.rejection().is_none());
    }

    #[test]
    fn test_mode_serde() {
        assert_eq!(serde_json::to_string(&SubmissionMode::Async).unwrap(), "\"async\"");
        assert_eq!(SubmissionMode::default(), SubmissionMode::Sync);
    }
}
