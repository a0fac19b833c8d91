//! Submission coordinator for signed ledger transactions
//!
//! [`SubmissionCoordinator`] sends an envelope through a [`LedgerGateway`],
//! classifies the answer, backs off on transient failures, polls by hash
//! when the gateway times out, and never sends an envelope past its max
//! time. Rebuilding after `BAD_SEQ` or a confirmed expiry is explicit and
//! fetches a fresh sequence from an [`AccountSequenceProvider`].

pub mod clock;
pub mod coordinator;
pub mod error;
pub mod gateway;
pub mod history;
pub mod limited;
pub mod mock;
pub mod sequence;

pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::{CoordinatorConfig, SubmissionCoordinator};
pub use error::SubmitError;
pub use gateway::{GatewayError, LedgerGateway};
pub use history::TransactionHistory;
pub use limited::RateLimitedGateway;
pub use mock::{AsyncScript, LookupScript, MockLedgerGateway, StaticSequenceProvider, SyncScript};
pub use sequence::{AccountSequenceProvider, SequenceError};
