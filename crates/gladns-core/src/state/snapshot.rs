// # Record Snapshot
//
// In-memory cache of the records one connector manages.
//
// ## Purpose
//
// Lets the reconciler decide create-vs-update and skip no-op writes
// without asking the provider. Entries are keyed by normalized address.
//
// ## Consistency
//
// - Loaded in full by `connect`
// - An entry changes only after the provider call for it succeeded
// - Nothing outside the owning connector can mutate it
// - Lost on restart; the next `connect` rebuilds it from the provider

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::traits::MANAGED_RECORD_TYPE;

/// Last known provider-side state of one managed record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedRecord {
    /// Provider-assigned record identity
    pub id: String,
    /// IP the record points at
    pub ip: IpAddr,
    /// Record type
    pub record_type: String,
    /// When this process last wrote the record (`None` if only loaded)
    pub synced_at: Option<DateTime<Utc>>,
    /// Provider-side record is not a single value; never counts as in sync
    pub needs_rewrite: bool,
}

impl CachedRecord {
    /// A record found while enumerating the provider at connect
    pub(crate) fn loaded(id: impl Into<String>, ip: IpAddr) -> Self {
        Self {
            id: id.into(),
            ip,
            record_type: MANAGED_RECORD_TYPE.to_string(),
            synced_at: None,
            needs_rewrite: false,
        }
    }

    /// Mark a loaded record so the next pass rewrites it
    pub(crate) fn marked_for_rewrite(mut self) -> Self {
        self.needs_rewrite = true;
        self
    }

    /// Whether the record already resolves to exactly `ip`
    pub fn is_in_sync(&self, ip: IpAddr) -> bool {
        self.ip == ip && !self.needs_rewrite
    }

    /// A record this process just created or updated
    pub(crate) fn written(id: impl Into<String>, ip: IpAddr) -> Self {
        Self {
            id: id.into(),
            ip,
            record_type: MANAGED_RECORD_TYPE.to_string(),
            synced_at: Some(Utc::now()),
            needs_rewrite: false,
        }
    }
}

/// Connector-owned record cache
///
/// Reads are public; writes are crate-private so that only the reconciler
/// mutates the cache.
#[derive(Debug, Clone, Default)]
pub struct RecordSnapshot {
    inner: Arc<RwLock<HashMap<String, CachedRecord>>>,
}

impl RecordSnapshot {
    /// Create a new empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of cached records
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the snapshot is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Get the cached record for a normalized key
    pub async fn get(&self, key: &str) -> Option<CachedRecord> {
        self.inner.read().await.get(key).cloned()
    }

    /// Check whether a normalized key is cached
    pub async fn contains(&self, key: &str) -> bool {
        self.inner.read().await.contains_key(key)
    }

    /// All cached keys, sorted
    pub async fn keys(&self) -> Vec<String> {
        let guard = self.inner.read().await;
        let mut keys: Vec<String> = guard.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub(crate) async fn insert(&self, key: String, record: CachedRecord) {
        self.inner.write().await.insert(key, record);
    }

    pub(crate) async fn remove(&self, key: &str) -> Option<CachedRecord> {
        self.inner.write().await.remove(key)
    }

    /// Swap in a freshly enumerated set of records
    pub(crate) async fn replace_all(&self, records: HashMap<String, CachedRecord>) {
        *self.inner.write().await = records;
    }
}
