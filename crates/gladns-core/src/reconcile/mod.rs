//! Reconciliation engine
//!
//! [`Reconciler`] wraps a [`DnsBackend`] and implements the [`Connector`]
//! contract on top of it. It owns the backend's [`RecordSnapshot`] and turns
//! each desired [`NodeState`] into the smallest set of provider calls.
//!
//! ## Per-address algorithm
//!
//! ```text
//! address ──normalize──▶ key ──lookup──▶ snapshot
//!                                          │
//!            ┌─────────────────────────────┼──────────────────────────┐
//!            ▼                             ▼                          ▼
//!        not cached                  cached, same IP           cached, other IP
//!     create_record()                  no call                 update_record()
//!     cache on success                                         cache on success
//! ```
//!
//! Each address is handled on its own: a failed call is recorded in the
//! [`ReconcileReport`] and the pass moves on. Cached records missing from the
//! desired state are left alone; only [`Connector::remove_node`] deletes.

pub mod report;

pub use report::{AddressOutcome, ReconcileReport, RecordOutcome};

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::collections::hash_map::Entry;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::naming::{self, NameScheme};
use crate::state::{CachedRecord, NodeState, RecordSnapshot};
use crate::traits::{Connector, DnsBackend, ProviderRecord};

/// Generic connector driving any [`DnsBackend`]
///
/// Starts unconnected; [`Connector::connect`] loads the snapshot and moves
/// it to connected for the rest of its lifetime.
pub struct Reconciler<B> {
    /// Provider API adapter
    backend: B,

    /// Cache of managed records
    snapshot: RecordSnapshot,

    /// Set once `connect` succeeded
    connected: AtomicBool,
}

/// A desired entry after normalization
struct Target {
    address: String,
    ip: IpAddr,
}

impl<B: DnsBackend> Reconciler<B> {
    /// Wrap a backend; the result is unconnected
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            snapshot: RecordSnapshot::new(),
            connected: AtomicBool::new(false),
        }
    }

    /// The wrapped backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Read access to the record snapshot
    pub fn snapshot(&self) -> &RecordSnapshot {
        &self.snapshot
    }

    fn scheme(&self) -> &NameScheme {
        self.backend.name_scheme()
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(Error::NotConnected(self.backend.provider_name().to_string()))
        }
    }

    /// Keep the managed A records and key them by normalized address
    fn index_records(&self, records: Vec<ProviderRecord>) -> HashMap<String, CachedRecord> {
        let mut indexed = HashMap::new();

        for record in records {
            if !record.is_managed_type() {
                continue;
            }

            let Some(key) = self.scheme().key_for_record_name(&record.name) else {
                continue;
            };

            let ip: IpAddr = match record.data.parse() {
                Ok(ip) => ip,
                Err(_) => {
                    warn!(
                        "Ignoring record {} (id {}): content '{}' is not an IP address",
                        record.name, record.id, record.data
                    );
                    continue;
                }
            };

            match indexed.entry(key) {
                Entry::Vacant(slot) => {
                    let cached = CachedRecord::loaded(record.id, ip);
                    if record.needs_rewrite {
                        warn!(
                            "Record {} does not hold a single value, rewriting it on the next pass",
                            record.name
                        );
                        slot.insert(cached.marked_for_rewrite());
                    } else {
                        slot.insert(cached);
                    }
                }
                Entry::Occupied(slot) => {
                    warn!(
                        "Duplicate record {} (id {}) for {}, keeping id {}; delete id {} at the provider to stop it resolving",
                        record.name,
                        record.id,
                        slot.key(),
                        slot.get().id,
                        record.id
                    );
                }
            }
        }

        indexed
    }

    /// Normalize the desired state
    ///
    /// Returns the addresses to reconcile keyed by normalized key, plus the
    /// addresses rejected before any provider call.
    fn plan(&self, desired: &NodeState) -> (BTreeMap<String, Target>, Vec<(String, Target, String)>) {
        let mut addresses: Vec<(&String, &IpAddr)> = desired.iter().collect();
        addresses.sort();

        let mut targets: BTreeMap<String, Target> = BTreeMap::new();
        let mut rejected = Vec::new();

        for (address, ip) in addresses {
            let target = Target {
                address: address.clone(),
                ip: *ip,
            };

            let key = match self.scheme().key(address) {
                Ok(key) => key,
                Err(e) => {
                    rejected.push((naming::normalize(address), target, e.to_string()));
                    continue;
                }
            };

            if !ip.is_ipv4() {
                let reason = format!("{} is not an IPv4 address; only A records are managed", ip);
                rejected.push((key, target, reason));
                continue;
            }

            if let Some(existing) = targets.get(&key) {
                if existing.ip != *ip {
                    warn!(
                        "Addresses {} and {} normalize to {}; keeping {} -> {}",
                        existing.address, address, key, existing.address, existing.ip
                    );
                }
                continue;
            }

            targets.insert(key, target);
        }

        (targets, rejected)
    }

    /// Bring one address in line with the desired IP
    async fn reconcile_one(&self, key: &str, target: &Target) -> RecordOutcome {
        let name = self.scheme().record_name(key);
        let ip = target.ip;

        match self.snapshot.get(key).await {
            None => match self.backend.create_record(&name, ip).await {
                Ok(record) => {
                    info!("Created record {} -> {} (id {})", name, ip, record.id);
                    self.snapshot
                        .insert(key.to_string(), CachedRecord::written(record.id.clone(), ip))
                        .await;
                    RecordOutcome::Created { id: record.id }
                }
                Err(e) => self.failure(&target.address, format!("create {} -> {}: {}", name, ip, e)),
            },

            Some(cached) if cached.is_in_sync(ip) => {
                debug!("Record {} already points at {}, skipping", name, ip);
                RecordOutcome::Unchanged
            }

            Some(cached) => match self.backend.update_record(&cached.id, &name, ip).await {
                Ok(record) => {
                    info!(
                        "Updated record {} -> {} (previous: {}, id {})",
                        name, ip, cached.ip, record.id
                    );
                    self.snapshot
                        .insert(key.to_string(), CachedRecord::written(record.id.clone(), ip))
                        .await;
                    RecordOutcome::Updated {
                        id: record.id,
                        previous_ip: cached.ip,
                    }
                }
                Err(e) => self.failure(
                    &target.address,
                    format!("update {} (id {}) {} -> {}: {}", name, cached.id, cached.ip, ip, e),
                ),
            },
        }
    }

    fn failure(&self, address: &str, message: String) -> RecordOutcome {
        let error = Error::record_operation(address, message);
        warn!("{}", error);
        RecordOutcome::Failed {
            reason: error.to_string(),
        }
    }
}

#[async_trait]
impl<B: DnsBackend> Connector for Reconciler<B> {
    fn name(&self) -> &'static str {
        self.backend.provider_name()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn connect(&self) -> Result<()> {
        let provider = self.backend.provider_name();
        info!("Connecting to {}", provider);

        self.backend
            .authenticate()
            .await
            .map_err(|e| Error::connection(format!("{} authentication failed: {}", provider, e)))?;

        let records = self.backend.list_records().await.map_err(|e| {
            Error::connection(format!("{} record enumeration failed: {}", provider, e))
        })?;

        let listed = records.len();
        let managed = self.index_records(records);
        let count = managed.len();

        self.snapshot.replace_all(managed).await;
        self.connected.store(true, Ordering::Release);

        info!(
            "Connected to {}: {} managed record(s) out of {} listed",
            provider, count, listed
        );
        Ok(())
    }

    async fn update_state(&self, desired: &NodeState) -> Result<ReconcileReport> {
        self.ensure_connected()?;

        let (targets, rejected) = self.plan(desired);
        let mut report = ReconcileReport::new();

        for (key, target, reason) in rejected {
            let outcome = self.failure(&target.address, format!("{} (ip {})", reason, target.ip));
            report.record(key, target.address, target.ip, outcome);
        }

        for (key, target) in targets {
            let outcome = self.reconcile_one(&key, &target).await;
            report.record(key, target.address, target.ip, outcome);
        }

        debug!("Reconciled {} address(es): {}", report.total(), report);
        report.into_result()
    }

    async fn remove_node(&self, address: &str) -> Result<()> {
        self.ensure_connected()?;

        let key = self.scheme().key(address)?;
        let cached = self
            .snapshot
            .get(&key)
            .await
            .ok_or_else(|| Error::not_found(format!("no managed record for {}", address)))?;
        let name = self.scheme().record_name(&key);

        self.backend
            .delete_record(&cached.id, &name)
            .await
            .map_err(|e| {
                Error::record_operation(address, format!("delete {} (id {}): {}", name, cached.id, e))
            })?;

        self.snapshot.remove(&key).await;
        info!("Deleted record {} (id {})", name, cached.id);
        Ok(())
    }
}
