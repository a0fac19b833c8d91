//! In-memory collaborators for tests and local experiments

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tx_submitter_types::{
    AsyncStatus, AsyncSubmitResponse, GetTransactionsRequest, LedgerEntry, Network, Rejection,
    ResultCode, SyncSubmitResponse, TransactionEnvelope, TransactionHash, TransactionLookup,
    TransactionPage, TransactionRecord, TransactionStatus,
};

use crate::{AccountSequenceProvider, Clock, GatewayError, LedgerGateway, SequenceError};

const FIRST_LEDGER: u32 = 1_000;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Scripted answer to `submit_async`
#[derive(Debug, Clone)]
pub enum AsyncScript {
    Status(AsyncStatus),
    /// `ERROR` with a diagnostic attached
    Error(Rejection),
}

/// Scripted answer to `submit_sync`
#[derive(Debug, Clone)]
pub enum SyncScript {
    Include,
    Reject(Rejection),
    /// 504; the gateway keeps the envelope
    Timeout,
}

/// Scripted answer to a lookup by hash
#[derive(Debug, Clone)]
pub enum LookupScript {
    NotFound,
    Include,
    Fail(Rejection),
}

#[derive(Default)]
struct LedgerState {
    async_script: VecDeque<Result<AsyncScript, GatewayError>>,
    sync_script: VecDeque<Result<SyncScript, GatewayError>>,
    lookup_script: VecDeque<Result<LookupScript, GatewayError>>,
    history_script: VecDeque<GatewayError>,

    /// Envelopes the gateway holds but has not applied, with their max time
    pending: HashMap<TransactionHash, Option<u64>>,
    included: HashMap<TransactionHash, LedgerEntry>,
    history: Vec<TransactionRecord>,
    next_ledger: u32,

    sends: HashMap<TransactionHash, u32>,
    async_calls: u32,
    sync_calls: u32,
    lookup_calls: u32,
    history_calls: u32,
    expired_sends: u32,
}

/// Ledger gateway simulated in memory.
///
/// Without a script it behaves like a well-mannered network: new envelopes
/// are accepted, repeats of a known envelope answer `DUPLICATE`, a hash is
/// included at most once, and expired envelopes are refused with `TOO_LATE`.
/// Scripted answers are consumed first, one per call.
pub struct MockLedgerGateway {
    network: Network,
    clock: Arc<dyn Clock>,
    state: Mutex<LedgerState>,
}

impl MockLedgerGateway {
    pub fn new(network: Network, clock: Arc<dyn Clock>) -> Self {
        Self {
            network,
            clock,
            state: Mutex::new(LedgerState {
                next_ledger: FIRST_LEDGER,
                ..Default::default()
            }),
        }
    }

    pub fn script_async(&self, reply: Result<AsyncScript, GatewayError>) -> &Self {
        lock(&self.state).async_script.push_back(reply);
        self
    }

    pub fn script_sync(&self, reply: Result<SyncScript, GatewayError>) -> &Self {
        lock(&self.state).sync_script.push_back(reply);
        self
    }

    pub fn script_lookup(&self, reply: Result<LookupScript, GatewayError>) -> &Self {
        lock(&self.state).lookup_script.push_back(reply);
        self
    }

    pub fn script_history_error(&self, error: GatewayError) -> &Self {
        lock(&self.state).history_script.push_back(error);
        self
    }

    /// Append a record to the history served by `get_transactions`
    pub fn push_history(&self, record: TransactionRecord) {
        lock(&self.state).history.push(record);
    }

    /// Apply every pending envelope, as if a ledger closed
    pub fn close_ledger(&self) -> Vec<LedgerEntry> {
        let closed_at = self.clock.now_unix();
        let mut state = lock(&self.state);
        let hashes: Vec<TransactionHash> = state.pending.keys().cloned().collect();
        hashes
            .into_iter()
            .map(|hash| include(&mut state, hash, closed_at))
            .collect()
    }

    /// Total sends (async and sync) of one hash
    pub fn sends_of(&self, hash: &TransactionHash) -> u32 {
        lock(&self.state).sends.get(hash).copied().unwrap_or(0)
    }

    pub fn async_calls(&self) -> u32 {
        lock(&self.state).async_calls
    }

    pub fn sync_calls(&self) -> u32 {
        lock(&self.state).sync_calls
    }

    pub fn submission_attempts(&self) -> u32 {
        let state = lock(&self.state);
        state.async_calls + state.sync_calls
    }

    pub fn lookup_calls(&self) -> u32 {
        lock(&self.state).lookup_calls
    }

    pub fn history_calls(&self) -> u32 {
        lock(&self.state).history_calls
    }

    /// Sends of envelopes whose max time had already passed
    pub fn expired_sends(&self) -> u32 {
        lock(&self.state).expired_sends
    }

    pub fn inclusions(&self) -> usize {
        lock(&self.state).included.len()
    }

    pub fn is_included(&self, hash: &TransactionHash) -> bool {
        lock(&self.state).included.contains_key(hash)
    }

    /// Hash the envelope and record the send; `Err` carries a refusal for
    /// expired envelopes
    fn receive(
        &self,
        state: &mut LedgerState,
        envelope: &TransactionEnvelope,
    ) -> Result<TransactionHash, GatewayError> {
        let hash = envelope
            .hash(&self.network)
            .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;
        *state.sends.entry(hash.clone()).or_insert(0) += 1;
        if envelope.is_expired_at(self.clock.now_unix()) {
            state.expired_sends += 1;
        }
        Ok(hash)
    }

    fn is_known(state: &LedgerState, hash: &TransactionHash) -> bool {
        state.pending.contains_key(hash) || state.included.contains_key(hash)
    }
}

fn include(state: &mut LedgerState, hash: TransactionHash, closed_at: u64) -> LedgerEntry {
    state.pending.remove(&hash);
    if let Some(entry) = state.included.get(&hash) {
        return entry.clone();
    }
    let ledger = state.next_ledger;
    state.next_ledger += 1;
    let entry = LedgerEntry {
        hash: hash.clone(),
        ledger,
        application_order: 1,
        fee_charged: u64::from(tx_submitter_types::BASE_FEE),
        closed_at,
    };
    state.history.push(TransactionRecord {
        hash: hash.clone(),
        status: TransactionStatus::Success,
        ledger,
        application_order: 1,
        fee_bump: false,
        created_at: closed_at,
        result_code: None,
    });
    state.included.insert(hash, entry.clone());
    entry
}

#[async_trait]
impl LedgerGateway for MockLedgerGateway {
    async fn submit_async(
        &self,
        envelope: &TransactionEnvelope,
    ) -> Result<AsyncSubmitResponse, GatewayError> {
        let now = self.clock.now_unix();
        let mut state = lock(&self.state);
        state.async_calls += 1;
        let hash = self.receive(&mut state, envelope)?;

        let respond = |status, diagnostic| AsyncSubmitResponse {
            status,
            hash: hash.clone(),
            diagnostic,
        };

        if let Some(reply) = state.async_script.pop_front() {
            return match reply? {
                AsyncScript::Status(AsyncStatus::Pending) => {
                    state.pending.insert(hash.clone(), envelope.time_bound_max());
                    Ok(respond(AsyncStatus::Pending, None))
                }
                AsyncScript::Status(status) => Ok(respond(status, None)),
                AsyncScript::Error(rejection) => Ok(respond(AsyncStatus::Error, Some(rejection))),
            };
        }

        if Self::is_known(&state, &hash) {
            return Ok(respond(AsyncStatus::Duplicate, None));
        }
        if envelope.is_expired_at(now) {
            return Ok(respond(
                AsyncStatus::Error,
                Some(Rejection::new(ResultCode::TooLate)),
            ));
        }
        state.pending.insert(hash.clone(), envelope.time_bound_max());
        Ok(respond(AsyncStatus::Pending, None))
    }

    async fn submit_sync(
        &self,
        envelope: &TransactionEnvelope,
    ) -> Result<SyncSubmitResponse, GatewayError> {
        let now = self.clock.now_unix();
        let mut state = lock(&self.state);
        state.sync_calls += 1;
        let hash = self.receive(&mut state, envelope)?;

        if let Some(reply) = state.sync_script.pop_front() {
            return match reply? {
                SyncScript::Include => Ok(SyncSubmitResponse::Included(include(
                    &mut state, hash, now,
                ))),
                SyncScript::Reject(rejection) => Ok(SyncSubmitResponse::Rejected(rejection)),
                SyncScript::Timeout => {
                    if !Self::is_known(&state, &hash) {
                        state.pending.insert(hash.clone(), envelope.time_bound_max());
                    }
                    Ok(SyncSubmitResponse::Timeout { hash })
                }
            };
        }

        if !Self::is_known(&state, &hash) && envelope.is_expired_at(now) {
            return Ok(SyncSubmitResponse::Rejected(Rejection::new(
                ResultCode::TooLate,
            )));
        }
        Ok(SyncSubmitResponse::Included(include(&mut state, hash, now)))
    }

    async fn transaction(&self, hash: &TransactionHash) -> Result<TransactionLookup, GatewayError> {
        let now = self.clock.now_unix();
        let mut state = lock(&self.state);
        state.lookup_calls += 1;

        if let Some(reply) = state.lookup_script.pop_front() {
            return match reply? {
                LookupScript::NotFound => Ok(TransactionLookup::NotFound),
                LookupScript::Include => Ok(TransactionLookup::Included(include(
                    &mut state,
                    hash.clone(),
                    now,
                ))),
                LookupScript::Fail(rejection) => Ok(TransactionLookup::Failed(rejection)),
            };
        }

        if let Some(entry) = state.included.get(hash) {
            return Ok(TransactionLookup::Included(entry.clone()));
        }
        let expired = matches!(state.pending.get(hash), Some(Some(max_time)) if now > *max_time);
        if expired {
            state.pending.remove(hash);
            return Ok(TransactionLookup::Failed(Rejection::new(ResultCode::TooLate)));
        }
        Ok(TransactionLookup::NotFound)
    }

    async fn get_transactions(
        &self,
        request: &GetTransactionsRequest,
    ) -> Result<TransactionPage, GatewayError> {
        request
            .validate()
            .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;

        let mut state = lock(&self.state);
        state.history_calls += 1;
        if let Some(error) = state.history_script.pop_front() {
            return Err(error);
        }

        // Cursor is the index of the next record to serve
        let start = match (&request.cursor, request.start_ledger) {
            (Some(cursor), _) => cursor
                .parse::<usize>()
                .map_err(|_| GatewayError::InvalidRequest(format!("bad cursor: {cursor}")))?,
            (None, Some(ledger)) => state
                .history
                .iter()
                .position(|r| r.ledger >= ledger)
                .unwrap_or(state.history.len()),
            (None, None) => 0,
        };

        let start = start.min(state.history.len());
        let end = start
            .saturating_add(request.limit as usize)
            .min(state.history.len());
        let transactions = state.history[start..end].to_vec();

        let latest = state.history.last();
        let oldest = state.history.first();
        Ok(TransactionPage {
            transactions,
            latest_ledger: latest.map_or(0, |r| r.ledger),
            latest_ledger_close_time: latest.map_or(0, |r| r.created_at),
            oldest_ledger: oldest.map_or(0, |r| r.ledger),
            oldest_ledger_close_time: oldest.map_or(0, |r| r.created_at),
            cursor: end.to_string(),
        })
    }
}

/// Sequence numbers from a fixed table
#[derive(Debug, Default)]
pub struct StaticSequenceProvider {
    sequences: Mutex<HashMap<String, u64>>,
    queries: Mutex<u32>,
}

impl StaticSequenceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, account: impl Into<String>, sequence: u64) -> Self {
        self.set_sequence(account, sequence);
        self
    }

    pub fn set_sequence(&self, account: impl Into<String>, sequence: u64) {
        lock(&self.sequences).insert(account.into(), sequence);
    }

    pub fn queries(&self) -> u32 {
        *lock(&self.queries)
    }
}

#[async_trait]
impl AccountSequenceProvider for StaticSequenceProvider {
    async fn current_sequence(&self, account: &str) -> Result<u64, SequenceError> {
        *lock(&self.queries) += 1;
        lock(&self.sequences)
            .get(account)
            .copied()
            .ok_or_else(|| SequenceError::AccountNotFound(account.to_string()))
    }
}
