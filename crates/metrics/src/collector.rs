use prometheus::{Encoder, TextEncoder};
use std::time::Duration;
use tx_submitter_types::{SubmissionMode, SubmissionOutcome};

use crate::metrics::*;

/// Records submission activity into the process-wide Prometheus registry
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsCollector;

impl MetricsCollector {
    pub fn new() -> Self {
        Self
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SUBMISSIONS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn record_submission(&self, mode: SubmissionMode) {
        SUBMISSIONS_TOTAL.with_label_values(&[mode.as_str()]).inc();
    }

    pub fn record_attempt(&self) {
        SUBMISSION_ATTEMPTS.inc();
    }

    /// Record a resend; `reason` is a short label such as `try_again_later`
    pub fn record_retry(&self, reason: &str) {
        SUBMISSION_RETRIES.with_label_values(&[reason]).inc();
    }

    pub fn record_submission_duration(&self, mode: SubmissionMode, duration: Duration) {
        SUBMISSION_DURATION
            .with_label_values(&[mode.as_str()])
            .observe(duration.as_millis() as f64);
    }

    pub fn record_rebuild(&self, cause: &str) {
        REBUILDS_TOTAL.with_label_values(&[cause]).inc();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // POLLING
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn record_poll(&self) {
        POLLS_TOTAL.inc();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // OUTCOMES
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn record_outcome(&self, outcome: &SubmissionOutcome) {
        OUTCOMES_TOTAL.with_label_values(&[outcome.kind()]).inc();
        if let Some(rejection) = outcome.rejection() {
            REJECTIONS_TOTAL
                .with_label_values(&[rejection.root_cause().code.as_str()])
                .inc();
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EXPORT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Export metrics in Prometheus text format
    pub fn export_metrics(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| MetricsError::EncodingError(e.to_string()))?;

        String::from_utf8(buffer).map_err(|e| MetricsError::EncodingError(e.to_string()))
    }
}

/// Metrics error types
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("encoding error: {0}")]
    EncodingError(String),
}
