//! Test doubles and common utilities for contract tests
//!
//! This module provides an in-memory DNS backend that records every call it
//! receives and a state source that replays a script of gateway responses.

#![allow(dead_code)]

use gladns_core::config::EngineConfig;
use gladns_core::error::{Error, Result};
use gladns_core::naming::NameScheme;
use gladns_core::traits::{DnsBackend, ProviderRecord};
use gladns_core::{NodeState, Reconciler};
use std::collections::{HashSet, VecDeque};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A provider call observed by [`MockBackend`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create { name: String, ip: IpAddr },
    Update { id: String, name: String, ip: IpAddr },
    Delete { id: String, name: String },
}

/// An in-memory DNS backend that tracks calls
///
/// Clones share all state, so a test can keep one handle while the
/// reconciler owns another.
#[derive(Clone)]
pub struct MockBackend {
    scheme: NameScheme,
    /// Records as the "provider" currently holds them
    records: Arc<Mutex<Vec<ProviderRecord>>>,
    /// Every write call, in order (including failed ones)
    calls: Arc<Mutex<Vec<Call>>>,
    /// Record names whose writes fail
    failing_names: Arc<Mutex<HashSet<String>>>,
    fail_auth: Arc<AtomicBool>,
    fail_list: Arc<AtomicBool>,
    list_call_count: Arc<AtomicUsize>,
    next_id: Arc<AtomicUsize>,
}

impl MockBackend {
    /// Empty backend using relative `<key>.cdn` names
    pub fn new() -> Self {
        Self {
            scheme: NameScheme::relative("cdn"),
            records: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            failing_names: Arc::new(Mutex::new(HashSet::new())),
            fail_auth: Arc::new(AtomicBool::new(false)),
            fail_list: Arc::new(AtomicBool::new(false)),
            list_call_count: Arc::new(AtomicUsize::new(0)),
            next_id: Arc::new(AtomicUsize::new(1)),
        }
    }

    /// Pre-populate a provider-side record; returns its id
    pub fn seed(&self, name: &str, record_type: &str, data: &str) -> String {
        self.push_seed(name, record_type, data, false)
    }

    /// Pre-populate a record the provider reports as holding extra values
    pub fn seed_multi_value(&self, name: &str, data: &str) -> String {
        self.push_seed(name, "A", data, true)
    }

    fn push_seed(&self, name: &str, record_type: &str, data: &str, needs_rewrite: bool) -> String {
        let id = self.allocate_id();
        self.records.lock().unwrap().push(ProviderRecord {
            id: id.clone(),
            name: name.to_string(),
            record_type: record_type.to_string(),
            data: data.to_string(),
            ttl: Some(1800),
            needs_rewrite,
        });
        id
    }

    /// Make `authenticate` fail
    pub fn fail_authentication(&self) {
        self.fail_auth.store(true, Ordering::SeqCst);
    }

    /// Make `list_records` fail
    pub fn fail_listing(&self) {
        self.fail_list.store(true, Ordering::SeqCst);
    }

    /// Make every write for a record name fail
    pub fn fail_name(&self, name: &str) {
        self.failing_names.lock().unwrap().insert(name.to_string());
    }

    /// Stop injecting write failures
    pub fn clear_failures(&self) {
        self.failing_names.lock().unwrap().clear();
    }

    /// All write calls so far
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn create_count(&self) -> usize {
        self.count(|call| matches!(call, Call::Create { .. }))
    }

    pub fn update_count(&self) -> usize {
        self.count(|call| matches!(call, Call::Update { .. }))
    }

    pub fn delete_count(&self) -> usize {
        self.count(|call| matches!(call, Call::Delete { .. }))
    }

    pub fn write_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Number of times `list_records` was called
    pub fn list_call_count(&self) -> usize {
        self.list_call_count.load(Ordering::SeqCst)
    }

    /// Provider-side record with the given id
    pub fn record(&self, id: &str) -> Option<ProviderRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|record| record.id == id)
            .cloned()
    }

    /// Number of provider-side records
    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|call| predicate(call)).count()
    }

    fn allocate_id(&self) -> String {
        format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn check_injected(&self, name: &str) -> Result<()> {
        if self.failing_names.lock().unwrap().contains(name) {
            return Err(Error::http(format!("injected failure for {}", name)));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DnsBackend for MockBackend {
    fn provider_name(&self) -> &'static str {
        "mock"
    }

    fn name_scheme(&self) -> &NameScheme {
        &self.scheme
    }

    async fn authenticate(&self) -> Result<()> {
        if self.fail_auth.load(Ordering::SeqCst) {
            return Err(Error::auth("invalid token"));
        }
        Ok(())
    }

    async fn list_records(&self) -> Result<Vec<ProviderRecord>> {
        self.list_call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Error::http("listing failed"));
        }
        Ok(self.records.lock().unwrap().clone())
    }

    async fn create_record(&self, name: &str, ip: IpAddr) -> Result<ProviderRecord> {
        self.calls.lock().unwrap().push(Call::Create {
            name: name.to_string(),
            ip,
        });
        self.check_injected(name)?;

        let record = ProviderRecord {
            id: self.allocate_id(),
            name: name.to_string(),
            record_type: "A".to_string(),
            data: ip.to_string(),
            ttl: Some(1800),
            needs_rewrite: false,
        };
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn update_record(&self, id: &str, name: &str, ip: IpAddr) -> Result<ProviderRecord> {
        self.calls.lock().unwrap().push(Call::Update {
            id: id.to_string(),
            name: name.to_string(),
            ip,
        });
        self.check_injected(name)?;

        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| Error::not_found(id.to_string()))?;
        record.data = ip.to_string();
        record.needs_rewrite = false;
        Ok(record.clone())
    }

    async fn delete_record(&self, id: &str, name: &str) -> Result<()> {
        self.calls.lock().unwrap().push(Call::Delete {
            id: id.to_string(),
            name: name.to_string(),
        });
        self.check_injected(name)?;

        self.records.lock().unwrap().retain(|record| record.id != id);
        Ok(())
    }
}

/// A reconciler driving a clone of `backend`
pub fn reconciler(backend: &MockBackend) -> Reconciler<MockBackend> {
    Reconciler::new(backend.clone())
}

/// One scripted gateway response
pub enum Step {
    State(NodeState),
    Unreachable,
    Malformed,
}

/// A state source replaying scripted gateway responses
///
/// Once the script is exhausted it keeps returning the last state it served.
#[derive(Clone)]
pub struct ScriptedStateSource {
    steps: Arc<Mutex<VecDeque<Step>>>,
    last: Arc<Mutex<NodeState>>,
    delay: Duration,
    fetch_count: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl ScriptedStateSource {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Arc::new(Mutex::new(steps.into())),
            last: Arc::new(Mutex::new(NodeState::new())),
            delay: Duration::ZERO,
            fetch_count: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always serve the same state
    pub fn fixed(state: NodeState) -> Self {
        Self::new(vec![Step::State(state)])
    }

    /// Make every fetch take `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Get the number of times fetch() was called
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent fetch() calls observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl gladns_core::StateSource for ScriptedStateSource {
    async fn fetch(&self) -> Result<NodeState> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let step = self.steps.lock().unwrap().pop_front();
        let result = match step {
            Some(Step::State(state)) => {
                *self.last.lock().unwrap() = state.clone();
                Ok(state)
            }
            Some(Step::Unreachable) => Err(Error::transport("connection refused")),
            Some(Step::Malformed) => Err(Error::decode("missing node_data_map")),
            None => Ok(self.last.lock().unwrap().clone()),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn describe(&self) -> String {
        "scripted gateway".to_string()
    }
}

/// Parse an IP literal
pub fn ip(s: &str) -> IpAddr {
    s.parse().expect("valid IP literal")
}

/// Build a NodeState from (address, ip) pairs
pub fn node_state(entries: &[(&str, &str)]) -> NodeState {
    entries
        .iter()
        .map(|(address, addr)| (address.to_string(), ip(addr)))
        .collect()
}

/// Engine settings with a short tick for tests
pub fn fast_engine_config() -> EngineConfig {
    EngineConfig {
        tick_interval_ms: 20,
        event_channel_capacity: 100,
    }
}
