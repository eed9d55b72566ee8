use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use crate::{LedgerStore, StoreError};

/// Simple in-memory ledger for tests and demos. Individual get/put calls are
/// atomic under the internal mutex.
///
/// Keys can be marked as failing to exercise error paths.
pub struct InMemoryLedger {
    inner: Mutex<BTreeMap<String, Vec<u8>>>,
    failing_reads: Mutex<BTreeSet<String>>,
    failing_writes: Mutex<BTreeSet<String>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BTreeMap::new()),
            failing_reads: Mutex::new(BTreeSet::new()),
            failing_writes: Mutex::new(BTreeSet::new()),
        }
    }

    /// Make every subsequent `get` of `key` fail.
    pub fn fail_reads_for(&self, key: &str) {
        if let Ok(mut keys) = self.failing_reads.lock() {
            keys.insert(key.to_string());
        }
    }

    /// Make every subsequent `put` of `key` fail.
    pub fn fail_writes_for(&self, key: &str) {
        if let Ok(mut keys) = self.failing_writes.lock() {
            keys.insert(key.to_string());
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.inner.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_failing(set: &Mutex<BTreeSet<String>>, key: &str) -> Result<bool, StoreError> {
        let keys = set
            .lock()
            .map_err(|_| StoreError::new("mutex poisoned"))?;
        Ok(keys.contains(key))
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore for InMemoryLedger {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        if Self::is_failing(&self.failing_reads, key)? {
            return Err(StoreError::new(format!("injected read failure for {key}")));
        }
        let map = self
            .inner
            .lock()
            .map_err(|_| StoreError::new("mutex poisoned"))?;
        Ok(map.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        if Self::is_failing(&self.failing_writes, key)? {
            return Err(StoreError::new(format!("injected write failure for {key}")));
        }
        let mut map = self
            .inner
            .lock()
            .map_err(|_| StoreError::new("mutex poisoned"))?;
        map.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get() {
        let ledger = InMemoryLedger::new();
        ledger.put("k", b"v").unwrap();
        assert_eq!(ledger.get("k").unwrap().as_deref(), Some(&b"v"[..]));
        assert_eq!(ledger.get("missing").unwrap(), None);
    }

    #[test]
    fn put_overwrites() {
        let ledger = InMemoryLedger::new();
        ledger.put("k", b"1").unwrap();
        ledger.put("k", b"2").unwrap();
        assert_eq!(ledger.get("k").unwrap(), Some(b"2".to_vec()));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn injected_failures_only_hit_marked_keys() {
        let ledger = InMemoryLedger::new();
        ledger.fail_writes_for("bad");
        ledger.fail_reads_for("bad");
        assert!(ledger.put("bad", b"x").is_err());
        assert!(ledger.get("bad").is_err());
        assert!(ledger.put("good", b"x").is_ok());
        assert!(!ledger.is_empty());
    }
}
