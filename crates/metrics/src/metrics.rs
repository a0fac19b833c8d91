use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, HistogramVec,
    IntCounter, IntCounterVec,
};

lazy_static! {
    // ═══════════════════════════════════════════════════════════════════════════
    // SUBMISSION METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Logical submissions started, by mode
    pub static ref SUBMISSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "tx_submitter_submissions_total",
        "Total number of logical submissions by mode",
        &["mode"]
    )
    .unwrap();

    /// Envelopes sent to the gateway, first attempts and retries alike
    pub static ref SUBMISSION_ATTEMPTS: IntCounter = register_int_counter!(
        "tx_submitter_submission_attempts_total",
        "Total number of envelope sends"
    )
    .unwrap();

    /// Resends after a transient answer, by reason
    pub static ref SUBMISSION_RETRIES: IntCounterVec = register_int_counter_vec!(
        "tx_submitter_submission_retries_total",
        "Total number of retries by reason",
        &["reason"]
    )
    .unwrap();

    /// Time from first send to a final outcome
    pub static ref SUBMISSION_DURATION: HistogramVec = register_histogram_vec!(
        "tx_submitter_submission_duration_ms",
        "Submission duration in milliseconds by mode",
        &["mode"],
        vec![10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0, 10000.0, 30000.0, 120000.0]
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // POLLING METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Status lookups issued while polling
    pub static ref POLLS_TOTAL: IntCounter = register_int_counter!(
        "tx_submitter_polls_total",
        "Total number of transaction status lookups"
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // OUTCOME METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Final outcomes by kind
    pub static ref OUTCOMES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "tx_submitter_outcomes_total",
        "Total submission outcomes by kind",
        &["kind"]
    )
    .unwrap();

    /// Rejections by result code
    pub static ref REJECTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "tx_submitter_rejections_total",
        "Total rejections by result code",
        &["code"]
    )
    .unwrap();

    /// Envelopes rebuilt after a sequence or expiry rejection
    pub static ref REBUILDS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "tx_submitter_rebuilds_total",
        "Total rebuilt envelopes by cause",
        &["cause"]
    )
    .unwrap();
}
