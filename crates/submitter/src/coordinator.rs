use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use tx_submitter_config::SubmitterConfig;
use tx_submitter_metrics::{MetricsCollector, SubmissionSpan};
use tx_submitter_ratelimit::{Backoff, BackoffPolicy};
use tx_submitter_types::{
    AsyncStatus, EnvelopeError, EnvelopeSigner, ErrorCategory, Network, PendingStatus, PendingTag,
    PollState, Rejection, ResultCode, SubmissionMode, SubmissionOutcome, SubmissionReport,
    SubmissionState, SyncSubmitResponse, TimeBounds, TransactionBody, TransactionEnvelope,
    TransactionHash, TransactionLookup,
};

use crate::{AccountSequenceProvider, Clock, GatewayError, LedgerGateway, SubmitError};

/// Retry and polling parameters of a [`SubmissionCoordinator`]
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorConfig {
    /// Mode used by [`SubmissionCoordinator::submit_default`]
    pub default_mode: SubmissionMode,
    /// Sends of one envelope, first attempt included
    pub max_attempts: u32,
    pub backoff: BackoffPolicy,
    pub poll_interval: Duration,
    /// Polling budget for envelopes without a max time
    pub max_poll_duration: Duration,
    /// Validity window given to rebuilt envelopes
    pub envelope_validity: Duration,
}

impl From<&SubmitterConfig> for CoordinatorConfig {
    fn from(config: &SubmitterConfig) -> Self {
        Self {
            default_mode: config.submission.default_mode,
            max_attempts: config.submission.max_attempts.max(1),
            backoff: config.submission.backoff.clone(),
            poll_interval: Duration::from_millis(config.polling.interval_ms),
            max_poll_duration: Duration::from_secs(config.polling.max_poll_duration_secs),
            envelope_validity: Duration::from_secs(config.submission.envelope_validity_secs),
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::from(&SubmitterConfig::default())
    }
}

type Resolution = (SubmissionOutcome, SubmissionState);

enum RetryDecision {
    Retry,
    WindowClosed,
    Exhausted,
}

/// Backoff that never hands out a delay shorter than the previous one,
/// even when a `retry_after` hint pushed that one up
struct RetryPacer {
    backoff: Box<dyn Backoff>,
    floor: Duration,
}

impl RetryPacer {
    fn new(policy: &BackoffPolicy) -> Self {
        Self {
            backoff: policy.build(),
            floor: Duration::ZERO,
        }
    }

    fn next(&mut self, hint: Option<Duration>) -> Duration {
        let delay = self
            .backoff
            .next_delay()
            .max(hint.unwrap_or_default())
            .max(self.floor);
        self.floor = delay;
        delay
    }

    fn reset(&mut self) {
        self.backoff.reset();
        self.floor = Duration::ZERO;
    }
}

/// Drives one envelope from first send to a classified outcome.
///
/// The coordinator holds no per-submission state; every call owns its own
/// [`PollState`], so one coordinator can serve concurrent submissions.
/// Ordering submissions of the same account is up to the caller.
pub struct SubmissionCoordinator {
    gateway: Arc<dyn LedgerGateway>,
    sequences: Arc<dyn AccountSequenceProvider>,
    clock: Arc<dyn Clock>,
    network: Network,
    config: CoordinatorConfig,
    metrics: Option<MetricsCollector>,
}

impl SubmissionCoordinator {
    pub fn new(
        gateway: Arc<dyn LedgerGateway>,
        sequences: Arc<dyn AccountSequenceProvider>,
        clock: Arc<dyn Clock>,
        network: Network,
    ) -> Self {
        Self {
            gateway,
            sequences,
            clock,
            network,
            config: CoordinatorConfig::default(),
            metrics: None,
        }
    }

    /// Coordinator wired from loaded configuration
    pub fn from_config(
        config: &SubmitterConfig,
        gateway: Arc<dyn LedgerGateway>,
        sequences: Arc<dyn AccountSequenceProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let coordinator = Self::new(
            gateway,
            sequences,
            clock,
            Network::new(config.network.passphrase()),
        )
        .with_config(CoordinatorConfig::from(config));

        if config.network.metrics_enabled {
            coordinator.with_metrics(MetricsCollector::new())
        } else {
            coordinator
        }
    }

    pub fn with_config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsCollector) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Submit an envelope and classify the answer
    pub async fn submit(
        &self,
        envelope: &TransactionEnvelope,
        mode: SubmissionMode,
    ) -> Result<SubmissionOutcome, SubmitError> {
        self.submit_with_report(envelope, mode)
            .await
            .map(|report| report.outcome)
    }

    /// Submit in the configured default mode
    pub async fn submit_default(
        &self,
        envelope: &TransactionEnvelope,
    ) -> Result<SubmissionOutcome, SubmitError> {
        self.submit(envelope, self.config.default_mode).await
    }

    /// Like [`submit`](Self::submit), also returning the lifecycle state and
    /// attempt counters. The report is what the rebuild helpers take as proof.
    pub async fn submit_with_report(
        &self,
        envelope: &TransactionEnvelope,
        mode: SubmissionMode,
    ) -> Result<SubmissionReport, SubmitError> {
        let hash = envelope.hash(&self.network)?;
        let span = SubmissionSpan::new(hash.clone(), mode).span();
        self.run_submission(envelope, mode, hash)
            .instrument(span)
            .await
    }

    /// Poll a hash until it resolves, its window closes, or the poll budget
    /// for unbounded envelopes is spent
    pub async fn poll(
        &self,
        hash: &TransactionHash,
        time_bound_max: Option<u64>,
    ) -> Result<SubmissionReport, SubmitError> {
        let span = tracing::info_span!("poll", hash = %hash);
        self.run_poll(hash, time_bound_max).instrument(span).await
    }

    /// A single lookup by hash; the caller controls cadence
    pub async fn poll_once(&self, hash: &TransactionHash) -> Result<TransactionLookup, SubmitError> {
        if let Some(metrics) = &self.metrics {
            metrics.record_poll();
        }
        let lookup = self.gateway.transaction(hash).await?;
        tracing::debug!(hash = %hash, lookup = ?lookup, "polled transaction");
        Ok(lookup)
    }

    /// Rebuild an envelope rejected with `BAD_SEQ`.
    ///
    /// Fetches the account's current sequence, signs a copy with sequence
    /// `current + 1` and a fresh time bound. Fails with
    /// [`SubmitError::SequenceNotAdvanced`] unless the new sequence is
    /// strictly greater than the rejected one.
    pub async fn rebuild_after_bad_sequence(
        &self,
        report: &SubmissionReport,
        envelope: &TransactionEnvelope,
        signers: &[&dyn EnvelopeSigner],
    ) -> Result<TransactionEnvelope, SubmitError> {
        self.ensure_report_matches(report, envelope)?;
        let code = report.outcome.rejection().map(|r| r.root_cause().code);
        if code != Some(ResultCode::BadSeq) {
            return Err(SubmitError::NotRebuildable(format!(
                "expected a {} rejection, got {}",
                ResultCode::BadSeq,
                describe(report)
            )));
        }
        let body = rebuildable_body(envelope)?;

        let rejected = body.sequence_number;
        let current = self
            .sequences
            .current_sequence(&body.source_account)
            .await?;
        let next = current.saturating_add(1);
        if next <= rejected {
            tracing::warn!(rejected, current, "account sequence has not moved past the rejected one");
            return Err(SubmitError::SequenceNotAdvanced { rejected, next });
        }

        self.rebuild(body, next, signers, "bad_seq")
    }

    /// Rebuild an envelope whose expiry the ledger confirmed
    pub async fn rebuild_after_expiry(
        &self,
        report: &SubmissionReport,
        envelope: &TransactionEnvelope,
        signers: &[&dyn EnvelopeSigner],
    ) -> Result<TransactionEnvelope, SubmitError> {
        self.ensure_report_matches(report, envelope)?;
        if report.state != SubmissionState::ExpiredConfirmed {
            return Err(SubmitError::NotRebuildable(format!(
                "expiry not confirmed: {}",
                describe(report)
            )));
        }
        let body = rebuildable_body(envelope)?;

        let current = self
            .sequences
            .current_sequence(&body.source_account)
            .await?;
        self.rebuild(body, current.saturating_add(1), signers, "expired")
    }

    async fn run_submission(
        &self,
        envelope: &TransactionEnvelope,
        mode: SubmissionMode,
        hash: TransactionHash,
    ) -> Result<SubmissionReport, SubmitError> {
        let now = self.clock.now_unix();
        let time_bound_max = envelope.time_bound_max();
        if time_bound_max.is_none() {
            tracing::warn!("envelope has no max time; it stays valid until applied");
        }
        let time_bounds = envelope.time_bounds();
        if time_bounds.is_premature_at(now) {
            tracing::warn!(
                min_time = time_bounds.min_time,
                now,
                "envelope is not valid yet; the ledger will answer TOO_EARLY"
            );
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_submission(mode);
        }
        let started_ms = self.clock.now_millis();
        let mut poll = PollState::new(hash, now, time_bound_max);
        let (outcome, state) = match mode {
            SubmissionMode::Async => self.run_async(envelope, &mut poll).await?,
            SubmissionMode::Sync => self.run_sync(envelope, &mut poll).await?,
        };

        self.record_finish(Some(mode), started_ms, &outcome);
        tracing::info!(
            outcome = outcome.kind(),
            state = state.as_str(),
            attempts = poll.attempt_count,
            polls = poll.poll_count,
            "submission finished"
        );
        Ok(SubmissionReport {
            outcome,
            state,
            poll,
        })
    }

    async fn run_poll(
        &self,
        hash: &TransactionHash,
        time_bound_max: Option<u64>,
    ) -> Result<SubmissionReport, SubmitError> {
        let started_ms = self.clock.now_millis();
        let mut poll = PollState::new(hash.clone(), self.clock.now_unix(), time_bound_max);
        let (outcome, state) = self.poll_until_resolved(&mut poll).await?;
        self.record_finish(None, started_ms, &outcome);
        Ok(SubmissionReport {
            outcome,
            state,
            poll,
        })
    }

    async fn run_async(
        &self,
        envelope: &TransactionEnvelope,
        poll: &mut PollState,
    ) -> Result<Resolution, SubmitError> {
        let mut pacer = RetryPacer::new(&self.config.backoff);
        loop {
            if !self.window_open(envelope, poll)? {
                return Ok((SubmissionOutcome::TimedOut, SubmissionState::Submitted));
            }
            self.record_send(poll);

            let (reason, hint) = match self.gateway.submit_async(envelope).await {
                Ok(response) => match response.status {
                    AsyncStatus::Pending | AsyncStatus::Duplicate => {
                        if response.hash != poll.transaction_hash {
                            tracing::warn!(gateway_hash = %response.hash, "gateway reported a different hash");
                        }
                        let tag = match response.status {
                            AsyncStatus::Duplicate => PendingTag::Duplicate,
                            _ => PendingTag::Pending,
                        };
                        tracing::info!(status = ?response.status, "envelope accepted");
                        let status = PendingStatus {
                            hash: poll.transaction_hash.clone(),
                            tag,
                        };
                        return Ok((SubmissionOutcome::Pending(status), SubmissionState::Pending));
                    }
                    AsyncStatus::Error => {
                        let rejection = response
                            .diagnostic
                            .unwrap_or_else(|| Rejection::new(ResultCode::InternalError));
                        return Ok(self.rejected(rejection));
                    }
                    AsyncStatus::TryAgainLater => ("try_again_later", None),
                },
                Err(GatewayError::EnvelopeExpired { max_time }) => {
                    return self.expired_before_send(poll, max_time)
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(error = %e, "transient gateway failure");
                    (e.reason(), e.retry_after())
                }
                Err(e) => {
                    tracing::error!(error = %e, "gateway failure");
                    return Err(e.into());
                }
            };

            match self.wait_for_retry(poll, &mut pacer, hint, reason).await {
                RetryDecision::Retry => continue,
                RetryDecision::WindowClosed => {
                    return Ok((SubmissionOutcome::TimedOut, SubmissionState::Submitted))
                }
                RetryDecision::Exhausted => {
                    return Err(SubmitError::RetriesExhausted {
                        attempts: poll.attempt_count,
                    })
                }
            }
        }
    }

    async fn run_sync(
        &self,
        envelope: &TransactionEnvelope,
        poll: &mut PollState,
    ) -> Result<Resolution, SubmitError> {
        let mut pacer = RetryPacer::new(&self.config.backoff);
        loop {
            if !self.window_open(envelope, poll)? {
                return Ok((SubmissionOutcome::TimedOut, SubmissionState::Submitted));
            }
            self.record_send(poll);

            let (reason, hint) = match self.gateway.submit_sync(envelope).await {
                Ok(SyncSubmitResponse::Included(entry)) => {
                    tracing::info!(ledger = entry.ledger, "transaction included");
                    return Ok((SubmissionOutcome::Success(entry), SubmissionState::Succeeded));
                }
                Ok(SyncSubmitResponse::Rejected(rejection)) => return Ok(self.rejected(rejection)),
                Ok(SyncSubmitResponse::Timeout { .. }) => {
                    // the gateway holds the envelope; resending is never needed from here
                    tracing::info!("gateway timed out, polling by hash");
                    return self.poll_until_resolved(poll).await;
                }
                Err(GatewayError::EnvelopeExpired { max_time }) => {
                    return self.expired_before_send(poll, max_time)
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(error = %e, "transient gateway failure");
                    (e.reason(), e.retry_after())
                }
                Err(e) => {
                    tracing::error!(error = %e, "gateway failure");
                    return Err(e.into());
                }
            };

            match self.wait_for_retry(poll, &mut pacer, hint, reason).await {
                RetryDecision::Retry => continue,
                RetryDecision::WindowClosed => {
                    return Ok((SubmissionOutcome::TimedOut, SubmissionState::Submitted))
                }
                RetryDecision::Exhausted => {
                    return Err(SubmitError::RetriesExhausted {
                        attempts: poll.attempt_count,
                    })
                }
            }
        }
    }

    /// Look the hash up until the ledger answers.
    ///
    /// Absence inside the validity window means "still pending". Once the
    /// window has closed exactly one more lookup is made, looking for a
    /// `TOO_LATE` confirmation.
    async fn poll_until_resolved(&self, poll: &mut PollState) -> Result<Resolution, SubmitError> {
        let started_ms = self.clock.now_millis();
        let mut pacer = RetryPacer::new(&self.config.backoff);

        loop {
            let expired = poll.is_expired_at(self.clock.now_unix());
            poll.record_poll();
            if let Some(metrics) = &self.metrics {
                metrics.record_poll();
            }

            let delay = match self.gateway.transaction(&poll.transaction_hash).await {
                Ok(TransactionLookup::Included(entry)) => {
                    tracing::info!(ledger = entry.ledger, polls = poll.poll_count, "transaction included");
                    return Ok((SubmissionOutcome::Success(entry), SubmissionState::Succeeded));
                }
                Ok(TransactionLookup::Failed(rejection)) => return Ok(self.rejected(rejection)),
                Ok(TransactionLookup::NotFound) if expired => {
                    tracing::info!(polls = poll.poll_count, "window closed without an expiry confirmation");
                    return Ok((SubmissionOutcome::TimedOut, SubmissionState::Pending));
                }
                Ok(TransactionLookup::NotFound) => {
                    tracing::debug!(poll = poll.poll_count, "transaction not found yet");
                    pacer.reset();
                    self.config.poll_interval
                }
                Err(e) if e.is_transient() => {
                    if expired {
                        tracing::warn!(error = %e, "expiry confirmation lookup failed");
                        return Ok((SubmissionOutcome::TimedOut, SubmissionState::Pending));
                    }
                    let delay = pacer.next(e.retry_after()).max(self.config.poll_interval);
                    tracing::warn!(error = %e, delay_ms = delay.as_millis() as u64, "lookup failed, backing off");
                    delay
                }
                Err(e) => {
                    tracing::error!(error = %e, "lookup failed");
                    return Err(e.into());
                }
            };

            if poll.time_bound_max.is_none() {
                let elapsed =
                    Duration::from_millis(self.clock.now_millis().saturating_sub(started_ms));
                if elapsed + delay > self.config.max_poll_duration {
                    tracing::info!(
                        polls = poll.poll_count,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "poll budget spent, outcome unknown"
                    );
                    return Ok((SubmissionOutcome::Unknown, SubmissionState::Pending));
                }
            }

            self.clock.sleep(delay).await;
        }
    }

    /// `Ok(false)` once the envelope has expired after having been sent;
    /// an envelope that expired before its first send is an error
    fn window_open(
        &self,
        envelope: &TransactionEnvelope,
        poll: &PollState,
    ) -> Result<bool, SubmitError> {
        let now = self.clock.now_unix();
        match envelope.time_bound_max() {
            Some(max_time) if now > max_time => {
                if poll.attempt_count == 0 {
                    tracing::warn!(max_time, now, "refusing to send expired envelope");
                    return Err(SubmitError::EnvelopeExpired { max_time, now });
                }
                tracing::info!(
                    max_time,
                    attempts = poll.attempt_count,
                    "validity window closed, envelope will not be sent again"
                );
                Ok(false)
            }
            _ => Ok(true),
        }
    }

    /// The gateway held the envelope back until its max time passed; the
    /// attempt never reached the ledger
    fn expired_before_send(
        &self,
        poll: &mut PollState,
        max_time: u64,
    ) -> Result<Resolution, SubmitError> {
        poll.attempt_count = poll.attempt_count.saturating_sub(1);
        let now = self.clock.now_unix();
        if poll.attempt_count == 0 {
            tracing::warn!(max_time, now, "envelope expired before it could be sent");
            return Err(SubmitError::EnvelopeExpired { max_time, now });
        }
        tracing::info!(
            max_time,
            attempts = poll.attempt_count,
            "validity window closed while waiting to resend"
        );
        Ok((SubmissionOutcome::TimedOut, SubmissionState::Submitted))
    }

    fn record_send(&self, poll: &mut PollState) {
        poll.record_attempt();
        if let Some(metrics) = &self.metrics {
            metrics.record_attempt();
        }
        tracing::debug!(attempt = poll.attempt_count, "sending envelope");
    }

    async fn wait_for_retry(
        &self,
        poll: &PollState,
        pacer: &mut RetryPacer,
        hint: Option<Duration>,
        reason: &'static str,
    ) -> RetryDecision {
        if poll.attempt_count >= self.config.max_attempts {
            tracing::warn!(attempts = poll.attempt_count, reason, "retry budget spent");
            return RetryDecision::Exhausted;
        }

        let mut delay = pacer.next(hint);
        if let Some(remaining) = self.remaining_window(poll) {
            if remaining.is_zero() {
                return RetryDecision::WindowClosed;
            }
            delay = delay.min(remaining);
        }

        tracing::warn!(
            attempt = poll.attempt_count,
            delay_ms = delay.as_millis() as u64,
            reason,
            "retrying submission"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_retry(reason);
        }
        self.clock.sleep(delay).await;
        RetryDecision::Retry
    }

    /// Time until the last millisecond of the envelope's max time;
    /// `None` when unbounded
    fn remaining_window(&self, poll: &PollState) -> Option<Duration> {
        poll.time_bound_max.map(|max_time| {
            let last_valid_ms = max_time.saturating_mul(1000).saturating_add(999);
            Duration::from_millis(last_valid_ms.saturating_sub(self.clock.now_millis()))
        })
    }

    fn rejected(&self, rejection: Rejection) -> Resolution {
        let code = rejection.root_cause().code;
        if rejection.confirms_expiry() {
            tracing::info!(code = %code, "ledger confirmed expiry");
            return (
                SubmissionOutcome::Rejected(rejection),
                SubmissionState::ExpiredConfirmed,
            );
        }

        match code.category() {
            ErrorCategory::StateDivergence => {
                tracing::warn!(code = %code, "sequence mismatch, rebuild with a fresh sequence")
            }
            ErrorCategory::Structural => {
                tracing::warn!(code = %code, remedy = ?code.remedy(), "envelope rejected")
            }
            _ => tracing::info!(code = %code, remedy = ?code.remedy(), "envelope rejected"),
        }
        (SubmissionOutcome::Rejected(rejection), SubmissionState::Rejected)
    }

    fn record_finish(&self, mode: Option<SubmissionMode>, started_ms: u64, outcome: &SubmissionOutcome) {
        let Some(metrics) = &self.metrics else {
            return;
        };
        metrics.record_outcome(outcome);
        if let Some(mode) = mode {
            let elapsed = self.clock.now_millis().saturating_sub(started_ms);
            metrics.record_submission_duration(mode, Duration::from_millis(elapsed));
        }
    }

    fn ensure_report_matches(
        &self,
        report: &SubmissionReport,
        envelope: &TransactionEnvelope,
    ) -> Result<(), SubmitError> {
        let hash = envelope.hash(&self.network)?;
        if &hash != report.hash() {
            return Err(SubmitError::ReportMismatch {
                report: report.hash().clone(),
                envelope: hash,
            });
        }
        Ok(())
    }

    fn rebuild(
        &self,
        body: &TransactionBody,
        sequence_number: u64,
        signers: &[&dyn EnvelopeSigner],
        cause: &'static str,
    ) -> Result<TransactionEnvelope, SubmitError> {
        let max_time = self
            .clock
            .now_unix()
            .saturating_add(self.config.envelope_validity.as_secs());
        let signed = body
            .rebuilt(sequence_number, TimeBounds::until(max_time))
            .sign(&self.network, signers)?;

        if let Some(metrics) = &self.metrics {
            metrics.record_rebuild(cause);
        }
        tracing::info!(
            old_sequence = body.sequence_number,
            new_sequence = sequence_number,
            max_time,
            cause,
            "rebuilt envelope"
        );
        Ok(signed.into())
    }
}

/// Fee-bump envelopes carry the inner signature of another party and are
/// rebuilt by whoever owns the inner transaction
fn rebuildable_body(envelope: &TransactionEnvelope) -> Result<&TransactionBody, EnvelopeError> {
    match envelope {
        TransactionEnvelope::Transaction(tx) => Ok(&tx.body),
        TransactionEnvelope::FeeBump(_) => Err(EnvelopeError::FeeBumpRebuild),
    }
}

fn describe(report: &SubmissionReport) -> String {
    format!("{} ({})", report.outcome.kind(), report.state.as_str())
}
