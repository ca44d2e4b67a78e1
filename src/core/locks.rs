use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

const PRUNE_THRESHOLD: usize = 1024;

/// Async mutexes keyed by record id
///
/// Every write that reads an invoice's ledger and acts on it (recording or
/// editing a note, issuing a receipt, replacing items) holds the invoice's
/// guard, so those check-then-write sequences run one at a time per invoice.
#[derive(Default)]
pub struct KeyedLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the guard of `key`; released when dropped
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        if self.locks.len() > PRUNE_THRESHOLD {
            // only entries nobody holds or waits on
            self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }

        let lock = self.locks.entry(key.to_string()).or_default().clone();
        lock.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
