use futures::stream::{self, Stream, StreamExt};
use std::sync::Arc;
use tx_submitter_types::{GetTransactionsRequest, TransactionPage, TransactionRecord};

use crate::{LedgerGateway, SubmitError};

/// Pager over the gateway's `get_transactions` query
pub struct TransactionHistory {
    gateway: Arc<dyn LedgerGateway>,
}

impl TransactionHistory {
    pub fn new(gateway: Arc<dyn LedgerGateway>) -> Self {
        Self { gateway }
    }

    /// Pages starting at `start_ledger`, following cursors until an empty
    /// page. The first request is by ledger, every later one by cursor.
    pub fn pages(
        &self,
        start_ledger: u32,
        page_limit: u32,
    ) -> impl Stream<Item = Result<TransactionPage, SubmitError>> + '_ {
        let first = GetTransactionsRequest::from_ledger(start_ledger).with_limit(page_limit);

        stream::unfold(Some(first), move |next| async move {
            let request = next?;
            if let Err(e) = request.validate() {
                return Some((Err(SubmitError::from(e)), None));
            }

            match self.gateway.get_transactions(&request).await {
                Ok(page) if page.transactions.is_empty() => None,
                Ok(page) => {
                    tracing::debug!(
                        records = page.transactions.len(),
                        cursor = %page.cursor,
                        latest_ledger = page.latest_ledger,
                        "fetched transaction page"
                    );
                    // a cursor that does not move would loop forever
                    let following = (request.cursor.as_deref() != Some(page.cursor.as_str()))
                        .then(|| {
                            GetTransactionsRequest::from_cursor(page.cursor.clone())
                                .with_limit(request.limit)
                        });
                    Some((Ok(page), following))
                }
                Err(e) => Some((Err(SubmitError::from(e)), None)),
            }
        })
    }

    /// Gather up to `max_records` records starting at `start_ledger`
    pub async fn collect(
        &self,
        start_ledger: u32,
        page_limit: u32,
        max_records: usize,
    ) -> Result<Vec<TransactionRecord>, SubmitError> {
        let mut records = Vec::new();
        if max_records == 0 {
            return Ok(records);
        }

        let mut pages = Box::pin(self.pages(start_ledger, page_limit));
        while records.len() < max_records {
            match pages.next().await {
                Some(page) => records.extend(page?.transactions),
                None => break,
            }
        }
        records.truncate(max_records);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockLedgerGateway;
    use crate::{GatewayError, ManualClock};
    use tx_submitter_types::{
        Network, PaginationError, TransactionHash, TransactionStatus, MAX_PAGE_LIMIT,
    };

    fn gateway_with_history(records: u32) -> Arc<MockLedgerGateway> {
        let clock = Arc::new(ManualClock::new(1_000));
        let gateway = Arc::new(MockLedgerGateway::new(Network::testnet(), clock));
        for i in 0..records {
            gateway.push_history(TransactionRecord {
                hash: TransactionHash::from_bytes([i as u8; 32]),
                status: if i % 3 == 0 {
                    TransactionStatus::Failed
                } else {
                    TransactionStatus::Success
                },
                ledger: 100 + i / 2,
                application_order: i % 2 + 1,
                fee_bump: i % 4 == 0,
                created_at: 1_000 + u64::from(i),
                result_code: None,
            });
        }
        gateway
    }

    #[tokio::test]
    async fn test_collect_follows_cursors() {
        let gateway = gateway_with_history(25);
        let history = TransactionHistory::new(gateway.clone());

        let records = history.collect(100, 10, 100).await.unwrap();

        assert_eq!(records.len(), 25);
        // three full or partial pages, then the empty one
        assert_eq!(gateway.history_calls(), 4);
        assert!(records.windows(2).all(|w| w[0].ledger <= w[1].ledger));
    }

    #[tokio::test]
    async fn test_collect_stops_at_max_records() {
        let gateway = gateway_with_history(25);
        let history = TransactionHistory::new(gateway.clone());

        let records = history.collect(101, 4, 6).await.unwrap();

        assert_eq!(records.len(), 6);
        assert_eq!(records[0].ledger, 101);
        assert_eq!(gateway.history_calls(), 2);
    }

    #[tokio::test]
    async fn test_collect_rejects_bad_page_limit() {
        let history = TransactionHistory::new(gateway_with_history(1));

        for limit in [0, MAX_PAGE_LIMIT + 1] {
            let result = history.collect(100, limit, 10).await;
            assert!(matches!(
                result,
                Err(SubmitError::Pagination(PaginationError::InvalidLimit { .. }))
            ));
        }
        assert!(history.collect(100, MAX_PAGE_LIMIT, 10).await.is_ok());
    }

    #[tokio::test]
    async fn test_collect_propagates_gateway_error() {
        let gateway = gateway_with_history(5);
        gateway.script_history_error(GatewayError::Unavailable("503".into()));
        let history = TransactionHistory::new(gateway);

        assert!(matches!(
            history.collect(100, 10, 10).await,
            Err(SubmitError::Gateway(GatewayError::Unavailable(_)))
        ));
    }

    #[tokio::test]
    async fn test_zero_max_records() {
        let gateway = gateway_with_history(5);
        let history = TransactionHistory::new(gateway.clone());

        assert!(history.collect(100, 10, 0).await.unwrap().is_empty());
        assert_eq!(gateway.history_calls(), 0);
    }
}
