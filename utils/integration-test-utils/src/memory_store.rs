//! HashMap-backed key-value store with raw-row seeding and failure
//! injection.

use async_trait::async_trait;
use push_dispatch::{ClientError, CompositeKey, KeySegment, KeyValueStore, RawRow, TokenAttributes};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// In-memory store keyed on the rendered `kind#id` segment strings, so tests
/// can seed malformed rows the way a corrupted backing table would hold them.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    rows: Mutex<BTreeMap<(String, String), TokenAttributes>>,
    fail_queries: AtomicBool,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a row bypassing key rendering; used to simulate corruption.
    pub async fn seed_raw(&self, primary: &str, secondary: &str, attributes: TokenAttributes) {
        self.rows
            .lock()
            .await
            .insert((primary.to_string(), secondary.to_string()), attributes);
    }

    /// Removes a row bypassing key rendering; used to simulate one half of
    /// a pair disappearing.
    pub async fn delete_raw(&self, primary: &str, secondary: &str) -> Option<TokenAttributes> {
        self.rows
            .lock()
            .await
            .remove(&(primary.to_string(), secondary.to_string()))
    }

    /// Makes every subsequent prefix query fail, for resolution-error paths.
    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::Relaxed);
    }

    pub async fn row_count(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn row(&self, primary: &str, secondary: &str) -> Option<TokenAttributes> {
        self.rows
            .lock()
            .await
            .get(&(primary.to_string(), secondary.to_string()))
            .cloned()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn put(&self, key: &CompositeKey, value: &TokenAttributes) -> Result<(), ClientError> {
        self.rows.lock().await.insert(
            (key.primary.to_string(), key.secondary.to_string()),
            value.clone(),
        );
        Ok(())
    }

    async fn get(&self, key: &CompositeKey) -> Result<Option<TokenAttributes>, ClientError> {
        Ok(self
            .rows
            .lock()
            .await
            .get(&(key.primary.to_string(), key.secondary.to_string()))
            .cloned())
    }

    async fn delete(&self, key: &CompositeKey) -> Result<Option<TokenAttributes>, ClientError> {
        Ok(self
            .rows
            .lock()
            .await
            .remove(&(key.primary.to_string(), key.secondary.to_string())))
    }

    async fn query_prefix(
        &self,
        primary: &KeySegment,
        secondary_prefix: &str,
    ) -> Result<Vec<RawRow>, ClientError> {
        if self.fail_queries.load(Ordering::Relaxed) {
            return Err(ClientError::new("memory store query failure injected"));
        }

        let primary = primary.to_string();
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .filter(|((row_primary, row_secondary), _)| {
                *row_primary == primary && row_secondary.starts_with(secondary_prefix)
            })
            .map(|((row_primary, row_secondary), attributes)| RawRow {
                primary: row_primary.clone(),
                secondary: row_secondary.clone(),
                attributes: attributes.clone(),
            })
            .collect())
    }
}
