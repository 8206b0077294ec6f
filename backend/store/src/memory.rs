use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use glob::Pattern;
use receiptforge_core::{KvStore, ReceiptError};

/// Process-local key-value store for tests and throwaway runs.
pub struct InMemoryKvStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> ReceiptError {
    ReceiptError::StoreUnavailable("in-memory store lock poisoned".into())
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ReceiptError> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), ReceiptError> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, ReceiptError> {
        let pattern = Pattern::new(pattern)
            .map_err(|e| ReceiptError::StoreUnavailable(format!("invalid key pattern: {e}")))?;
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries
            .keys()
            .filter(|key| pattern.matches(key))
            .cloned()
            .collect())
    }
}
