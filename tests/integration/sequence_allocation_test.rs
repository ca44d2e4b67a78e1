use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use billcore::core::{AppError, Result};
use billcore::sequences::{CounterStore, DocumentType, InMemoryCounterStore, SequenceAllocator, SequenceKey};

/// Concurrent allocation against a shared counter store
///
/// - N concurrent requests for one key receive distinct numbers prev+1..prev+N
/// - keys are independent
/// - an unreachable store fails loudly unless the fallback is requested

#[cfg(test)]
mod sequence_allocation_tests {
    use super::*;

    struct OfflineStore;

    #[async_trait]
    impl CounterStore for OfflineStore {
        async fn increment(&self, _key: &SequenceKey) -> Result<u64> {
            Err(AppError::allocation_failure("connection refused"))
        }

        async fn seed(&self, _key: &SequenceKey, _last_issued: u64) -> Result<u64> {
            Err(AppError::allocation_failure("connection refused"))
        }

        async fn current(&self, _key: &SequenceKey) -> Result<Option<u64>> {
            Err(AppError::allocation_failure("connection refused"))
        }
    }

    async fn allocate_concurrently(
        allocator: Arc<SequenceAllocator>,
        prefix: &'static str,
        document_type: DocumentType,
        count: usize,
    ) -> Vec<u64> {
        let handles: Vec<_> = (0..count)
            .map(|_| {
                let allocator = allocator.clone();
                tokio::spawn(async move {
                    allocator
                        .allocate_next_number(prefix, document_type)
                        .await
                        .unwrap()
                        .sequence
                })
            })
            .collect();

        let mut sequences = Vec::with_capacity(count);
        for handle in handles {
            sequences.push(handle.await.unwrap());
        }
        sequences
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_allocations_are_distinct_and_contiguous() {
        let allocator = Arc::new(SequenceAllocator::new(Arc::new(InMemoryCounterStore::new())));
        allocator
            .seed_from_document_number(DocumentType::CreditBill, "WNF-41")
            .await
            .unwrap();

        let mut sequences = allocate_concurrently(allocator.clone(), "WNF", DocumentType::CreditBill, 200).await;
        sequences.sort_unstable();

        let expected: Vec<u64> = (42..242).collect();
        assert_eq!(sequences, expected);
        assert_eq!(
            allocator.current("WNF", DocumentType::CreditBill).await.unwrap(),
            Some(241)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_keys_do_not_interfere() {
        let allocator = Arc::new(SequenceAllocator::new(Arc::new(InMemoryCounterStore::new())));

        let (bills, receipts, other_company) = tokio::join!(
            allocate_concurrently(allocator.clone(), "WNF", DocumentType::CreditBill, 50),
            allocate_concurrently(allocator.clone(), "WNF", DocumentType::PaymentReceipt, 30),
            allocate_concurrently(allocator.clone(), "ACME", DocumentType::CreditBill, 20),
        );

        for (sequences, count) in [(bills, 50u64), (receipts, 30), (other_company, 20)] {
            let unique: HashSet<u64> = sequences.iter().copied().collect();
            assert_eq!(unique.len() as u64, count);
            assert_eq!(unique.iter().max().copied(), Some(count));
        }
    }

    #[tokio::test]
    async fn test_unreachable_store_is_surfaced() {
        let allocator = SequenceAllocator::new(Arc::new(OfflineStore));

        let strict = allocator.allocate("WNF", DocumentType::CreditBill, false).await;
        assert!(matches!(strict, Err(AppError::AllocationFailure(_))));
        assert!(allocator.unconfirmed_numbers().is_empty());

        let fallback = allocator
            .allocate("WNF", DocumentType::CreditBill, true)
            .await
            .unwrap();
        assert!(!fallback.confirmed);
        assert_eq!(allocator.unconfirmed_numbers().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_fallback_numbers_never_repeat() {
        let allocator = Arc::new(SequenceAllocator::new(Arc::new(OfflineStore)));

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let allocator = allocator.clone();
                tokio::spawn(async move {
                    allocator
                        .allocate_with_fallback("WNF", DocumentType::CashBill)
                        .await
                        .unwrap()
                        .value
                })
            })
            .collect();

        let mut values = HashSet::new();
        for handle in handles {
            assert!(values.insert(handle.await.unwrap()));
        }
        assert_eq!(allocator.unconfirmed_numbers().len(), 64);
    }
}
