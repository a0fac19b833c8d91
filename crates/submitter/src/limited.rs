use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tx_submitter_config::GatewayConfig;
use tx_submitter_ratelimit::RateLimiter;
use tx_submitter_types::{
    AsyncSubmitResponse, GetTransactionsRequest, SyncSubmitResponse, TransactionEnvelope,
    TransactionHash, TransactionLookup, TransactionPage,
};

use crate::{Clock, GatewayError, LedgerGateway};

const SUBMIT_KEY: &str = "submit";
const QUERY_KEY: &str = "query";

/// Gateway wrapper that paces outgoing requests with token buckets.
///
/// Submissions and queries draw from separate buckets of the same size.
/// An empty bucket makes the call wait on the injected clock instead of
/// provoking a 429 from the gateway. A submission whose envelope would
/// expire during that wait fails with [`GatewayError::EnvelopeExpired`]
/// and is never forwarded.
pub struct RateLimitedGateway<G> {
    inner: G,
    limiter: RateLimiter,
    clock: Arc<dyn Clock>,
}

impl<G: LedgerGateway> RateLimitedGateway<G> {
    pub fn new(inner: G, requests_per_second: u32, burst: u32, clock: Arc<dyn Clock>) -> Self {
        let now_ms = clock.now_millis();
        let limiter = RateLimiter::new()
            .with_limit_at(SUBMIT_KEY, requests_per_second, burst, now_ms)
            .with_limit_at(QUERY_KEY, requests_per_second, burst, now_ms);
        Self {
            inner,
            limiter,
            clock,
        }
    }

    pub fn from_config(inner: G, config: &GatewayConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(inner, config.requests_per_second, config.burst, clock)
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    async fn acquire(&self, key: &str, max_time: Option<u64>) -> Result<(), GatewayError> {
        loop {
            let now_ms = self.clock.now_millis();
            ensure_sendable(max_time, now_ms)?;
            if self.limiter.try_acquire_at(key, now_ms) {
                return Ok(());
            }
            let wait = self.limiter.wait_time_at(key, now_ms);
            if wait == Duration::MAX {
                // a zero rate never refills
                return Err(GatewayError::RateLimited { retry_after: None });
            }
            let wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX);
            if let Err(e) = ensure_sendable(max_time, now_ms.saturating_add(wait_ms)) {
                tracing::warn!(key, wait_ms, error = %e, "dropping request that would outlive its envelope");
                return Err(e);
            }
            tracing::debug!(key, wait_ms, "throttling gateway request");
            self.clock.sleep(wait).await;
        }
    }
}

/// The envelope may still be sent at `at_ms` (through the last millisecond
/// of its max time)
fn ensure_sendable(max_time: Option<u64>, at_ms: u64) -> Result<(), GatewayError> {
    match max_time {
        Some(max_time) if at_ms > max_time.saturating_mul(1000).saturating_add(999) => {
            Err(GatewayError::EnvelopeExpired { max_time })
        }
        _ => Ok(()),
    }
}

#[async_trait]
impl<G: LedgerGateway> LedgerGateway for RateLimitedGateway<G> {
    async fn submit_async(
        &self,
        envelope: &TransactionEnvelope,
    ) -> Result<AsyncSubmitResponse, GatewayError> {
        self.acquire(SUBMIT_KEY, envelope.time_bound_max()).await?;
        self.inner.submit_async(envelope).await
    }

    async fn submit_sync(
        &self,
        envelope: &TransactionEnvelope,
    ) -> Result<SyncSubmitResponse, GatewayError> {
        self.acquire(SUBMIT_KEY, envelope.time_bound_max()).await?;
        self.inner.submit_sync(envelope).await
    }

    async fn transaction(&self, hash: &TransactionHash) -> Result<TransactionLookup, GatewayError> {
        self.acquire(QUERY_KEY, None).await?;
        self.inner.transaction(hash).await
    }

    async fn get_transactions(
        &self,
        request: &GetTransactionsRequest,
    ) -> Result<TransactionPage, GatewayError> {
        self.acquire(QUERY_KEY, None).await?;
        self.inner.get_transactions(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockLedgerGateway;
    use crate::ManualClock;
    use ed25519_dalek::SigningKey;
    use tx_submitter_types::{EnvelopeBuilder, EnvelopeSigner, Network, Operation};

    fn envelope(sequence: u64, max_time: u64) -> TransactionEnvelope {
        let key = SigningKey::from_bytes(&[4u8; 32]);
        EnvelopeBuilder::new(key.account_id(), sequence)
            .with_max_time(max_time)
            .add_operation(Operation::BumpSequence { bump_to: sequence })
            .sign(&Network::testnet(), &[&key])
            .unwrap()
    }

    fn limited(rps: u32, burst: u32) -> (Arc<ManualClock>, RateLimitedGateway<MockLedgerGateway>) {
        let clock = Arc::new(ManualClock::new(1_000));
        let inner = MockLedgerGateway::new(Network::testnet(), clock.clone());
        (clock.clone(), RateLimitedGateway::new(inner, rps, burst, clock))
    }

    #[tokio::test]
    async fn test_burst_then_wait() {
        let (clock, gateway) = limited(2, 2);
        let hash = TransactionHash::from_bytes([1u8; 32]);

        for _ in 0..3 {
            gateway.transaction(&hash).await.unwrap();
        }

        assert_eq!(gateway.inner().lookup_calls(), 3);
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(500)]);
    }

    #[tokio::test]
    async fn test_queries_do_not_drain_submissions() {
        let (clock, gateway) = limited(1, 1);
        let hash = TransactionHash::from_bytes([2u8; 32]);

        gateway.transaction(&hash).await.unwrap();
        let page = gateway
            .get_transactions(&GetTransactionsRequest::from_ledger(1))
            .await
            .unwrap();

        assert!(page.transactions.is_empty());
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(1)]);
        assert!(gateway.limiter.try_acquire_at(SUBMIT_KEY, clock.now_millis()));
    }

    #[tokio::test]
    async fn test_zero_rate_is_rate_limited() {
        let (_clock, gateway) = limited(0, 1);
        let hash = TransactionHash::from_bytes([3u8; 32]);

        gateway.transaction(&hash).await.unwrap();
        assert_eq!(
            gateway.transaction(&hash).await,
            Err(GatewayError::RateLimited { retry_after: None })
        );
    }

    #[tokio::test]
    async fn test_submission_not_forwarded_when_wait_outlives_envelope() {
        let (clock, gateway) = limited(1, 1);
        gateway.submit_sync(&envelope(1, 1_010)).await.unwrap();

        // bucket refills at 1_001.000, the envelope's last valid instant is 1_000.999
        let late = envelope(2, 1_000);
        assert_eq!(
            gateway.submit_sync(&late).await,
            Err(GatewayError::EnvelopeExpired { max_time: 1_000 })
        );
        assert_eq!(
            gateway.submit_async(&late).await,
            Err(GatewayError::EnvelopeExpired { max_time: 1_000 })
        );

        assert_eq!(gateway.inner().sync_calls(), 1);
        assert_eq!(gateway.inner().async_calls(), 0);
        assert_eq!(gateway.inner().expired_sends(), 0);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_submission_waits_when_envelope_outlives_throttle() {
        let (clock, gateway) = limited(1, 1);
        gateway.submit_sync(&envelope(1, 1_010)).await.unwrap();

        let response = gateway.submit_sync(&envelope(2, 1_001)).await.unwrap();
        assert!(matches!(response, SyncSubmitResponse::Included(_)));
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(1)]);
        assert_eq!(gateway.inner().sync_calls(), 2);
        assert_eq!(gateway.inner().expired_sends(), 0);
    }

    #[tokio::test]
    async fn test_already_expired_envelope_not_forwarded() {
        let (_clock, gateway) = limited(10, 10);
        assert_eq!(
            gateway.submit_async(&envelope(1, 999)).await,
            Err(GatewayError::EnvelopeExpired { max_time: 999 })
        );
        assert_eq!(gateway.inner().async_calls(), 0);
    }
}
