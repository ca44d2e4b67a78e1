use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::core::{AppError, Result};
use crate::modules::sequences::models::{DocumentNumber, DocumentType, SequenceKey};
use crate::modules::sequences::repositories::CounterStore;

/// A number handed out while the counter store was unreachable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnconfirmedNumber {
    pub key: SequenceKey,
    pub value: String,
    pub sequence: u64,
    pub issued_at: DateTime<Utc>,
}

/// Issues `"{prefix}-{n}"` document numbers per (company, document type)
///
/// The counter store performs the increment atomically; this service only
/// validates keys, keeps a local cache of the last number seen per key and
/// handles the degraded path when the store cannot be reached.
///
/// Numbers issued from the fallback are recorded per key; the first
/// successful allocation afterwards seeds the store past the highest of them
/// so a recovered store never hands one out again.
pub struct SequenceAllocator {
    store: Arc<dyn CounterStore>,
    last_known: DashMap<SequenceKey, u64>,
    fallback_high: DashMap<SequenceKey, u64>,
    unconfirmed: DashMap<(SequenceKey, u64), UnconfirmedNumber>,
}

impl SequenceAllocator {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self {
            store,
            last_known: DashMap::new(),
            fallback_high: DashMap::new(),
            unconfirmed: DashMap::new(),
        }
    }

    /// Allocate the next confirmed number, failing with `AllocationFailure`
    /// when the counter store is unreachable
    pub async fn allocate_next_number(
        &self,
        company_prefix: &str,
        document_type: DocumentType,
    ) -> Result<DocumentNumber> {
        let key = SequenceKey::new(company_prefix, document_type)?;

        let pending = self.fallback_high.get(&key).map(|high| *high);
        if let Some(high) = pending {
            let current = self.store.seed(&key, high).await.map_err(store_unreachable)?;
            self.fallback_high.remove_if(&key, |_, issued| *issued <= high);
            info!(
                sequence_key = %key,
                fallback_high = high,
                last_issued = current,
                "Counter store moved past fallback numbers"
            );
        }

        let sequence = self.store.increment(&key).await.map_err(store_unreachable)?;

        self.remember(&key, sequence);

        let number = DocumentNumber::confirmed(&key, sequence);
        info!(
            sequence_key = %key,
            document_number = %number,
            "Document number allocated"
        );

        Ok(number)
    }

    /// Allocate a number, degrading to a locally derived, unconfirmed number
    /// if the counter store is unreachable
    ///
    /// The fallback is the last number this process saw for the key plus one
    /// (`prefix-1` when none was seen). It is flagged `confirmed = false` and
    /// listed by [`Self::unconfirmed_numbers`] until reconciled.
    pub async fn allocate_with_fallback(
        &self,
        company_prefix: &str,
        document_type: DocumentType,
    ) -> Result<DocumentNumber> {
        match self.allocate_next_number(company_prefix, document_type).await {
            Ok(number) => Ok(number),
            Err(AppError::AllocationFailure(reason)) => {
                let key = SequenceKey::new(company_prefix, document_type)?;
                error!(sequence_key = %key, reason = %reason, "Counter store unreachable");

                let sequence = {
                    let mut entry = self.last_known.entry(key.clone()).or_insert(0);
                    *entry = entry.checked_add(1).ok_or_else(|| {
                        AppError::allocation_failure(format!("Sequence exhausted for {}", key))
                    })?;
                    *entry
                };
                {
                    let mut high = self.fallback_high.entry(key.clone()).or_insert(0);
                    *high = (*high).max(sequence);
                }

                let number = DocumentNumber::unconfirmed(&key, sequence);
                self.unconfirmed.insert(
                    (key.clone(), sequence),
                    UnconfirmedNumber {
                        key: key.clone(),
                        value: number.value.clone(),
                        sequence,
                        issued_at: Utc::now(),
                    },
                );

                warn!(
                    sequence_key = %key,
                    document_number = %number,
                    "Issued unconfirmed document number; requires reconciliation"
                );

                Ok(number)
            }
            Err(other) => Err(other),
        }
    }

    /// Allocate under the configured policy: strict, or with the flagged fallback
    pub async fn allocate(
        &self,
        company_prefix: &str,
        document_type: DocumentType,
        allow_unconfirmed: bool,
    ) -> Result<DocumentNumber> {
        if allow_unconfirmed {
            self.allocate_with_fallback(company_prefix, document_type).await
        } else {
            self.allocate_next_number(company_prefix, document_type).await
        }
    }

    /// Raise a sequence to at least the number parsed from `last_issued`
    /// (e.g. `"WNF-41"`), so the next allocation continues after it
    pub async fn seed_from_document_number(
        &self,
        document_type: DocumentType,
        last_issued: &str,
    ) -> Result<u64> {
        let (prefix, sequence) = DocumentNumber::parse(last_issued)?;
        let key = SequenceKey::new(prefix, document_type)?;

        let current = self.store.seed(&key, sequence).await?;
        self.remember(&key, current);

        info!(sequence_key = %key, last_issued = current, "Sequence seeded");

        Ok(current)
    }

    /// Last number issued for a key according to the counter store
    pub async fn current(
        &self,
        company_prefix: &str,
        document_type: DocumentType,
    ) -> Result<Option<u64>> {
        let key = SequenceKey::new(company_prefix, document_type)?;
        self.store.current(&key).await
    }

    /// Numbers issued from the fallback path, oldest first
    pub fn unconfirmed_numbers(&self) -> Vec<UnconfirmedNumber> {
        let mut numbers: Vec<UnconfirmedNumber> =
            self.unconfirmed.iter().map(|e| e.value().clone()).collect();
        numbers.sort_by(|a, b| a.issued_at.cmp(&b.issued_at).then(a.sequence.cmp(&b.sequence)));
        numbers
    }

    /// Drop a fallback number from the unconfirmed registry once replaced
    pub fn mark_reconciled(&self, document_type: DocumentType, value: &str) -> bool {
        let Ok((prefix, sequence)) = DocumentNumber::parse(value) else {
            return false;
        };
        let Ok(key) = SequenceKey::new(prefix, document_type) else {
            return false;
        };
        self.unconfirmed.remove(&(key, sequence)).is_some()
    }

    fn remember(&self, key: &SequenceKey, sequence: u64) {
        let mut entry = self.last_known.entry(key.clone()).or_insert(0);
        if *entry < sequence {
            *entry = sequence;
        }
    }
}

fn store_unreachable(e: AppError) -> AppError {
    match e {
        AppError::AllocationFailure(msg) => AppError::AllocationFailure(msg),
        other => AppError::allocation_failure(other.to_string()),
    }
}
