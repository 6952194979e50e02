//! Per-tick reconciliation results

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

use crate::error::{Error, Result};

/// What happened to one address during a reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// No record existed; one was created
    Created {
        /// Identity assigned by the provider
        id: String,
    },
    /// The record pointed elsewhere and was updated
    Updated {
        /// Identity of the record after the update
        id: String,
        /// The IP the record pointed at before
        previous_ip: IpAddr,
    },
    /// The record already pointed at the desired IP; no call was made
    Unchanged,
    /// The address could not be reconciled this tick
    Failed {
        /// Failure description (address, attempted IP and cause)
        reason: String,
    },
}

impl RecordOutcome {
    /// Whether this outcome involved a provider write
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Created { .. } | Self::Updated { .. })
    }

    /// Whether this outcome is a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Outcome for one address together with what was requested
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressOutcome {
    /// Address as reported by the state source
    pub address: String,
    /// Desired IP
    pub ip: IpAddr,
    /// Result
    pub outcome: RecordOutcome,
}

/// Results of one `update_state` call, keyed by normalized address
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    outcomes: BTreeMap<String, AddressOutcome>,
}

impl ReconcileReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(
        &mut self,
        key: impl Into<String>,
        address: impl Into<String>,
        ip: IpAddr,
        outcome: RecordOutcome,
    ) {
        self.outcomes.insert(
            key.into(),
            AddressOutcome {
                address: address.into(),
                ip,
                outcome,
            },
        );
    }

    /// Outcome for a normalized key
    pub fn get(&self, key: &str) -> Option<&AddressOutcome> {
        self.outcomes.get(key)
    }

    /// Shorthand for the bare outcome of a normalized key
    pub fn outcome(&self, key: &str) -> Option<&RecordOutcome> {
        self.outcomes.get(key).map(|entry| &entry.outcome)
    }

    /// Iterate over all outcomes in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AddressOutcome)> {
        self.outcomes.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    /// Iterate over failed addresses only
    pub fn failures(&self) -> impl Iterator<Item = (&str, &AddressOutcome)> {
        self.iter().filter(|(_, entry)| entry.outcome.is_failure())
    }

    /// Number of addresses processed
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of records created
    pub fn created(&self) -> usize {
        self.count(|outcome| matches!(outcome, RecordOutcome::Created { .. }))
    }

    /// Number of records updated
    pub fn updated(&self) -> usize {
        self.count(|outcome| matches!(outcome, RecordOutcome::Updated { .. }))
    }

    /// Number of addresses that needed no call
    pub fn unchanged(&self) -> usize {
        self.count(|outcome| matches!(outcome, RecordOutcome::Unchanged))
    }

    /// Number of failed addresses
    pub fn failed(&self) -> usize {
        self.count(RecordOutcome::is_failure)
    }

    /// Number of successful provider writes
    pub fn writes(&self) -> usize {
        self.count(RecordOutcome::is_write)
    }

    /// Whether every processed address failed
    pub fn is_total_failure(&self) -> bool {
        self.total() > 0 && self.failed() == self.total()
    }

    /// Surface a total failure as an error
    pub(crate) fn into_result(self) -> Result<Self> {
        if !self.is_total_failure() {
            return Ok(self);
        }

        let last_error = self
            .failures()
            .last()
            .and_then(|(_, entry)| match &entry.outcome {
                RecordOutcome::Failed { reason } => Some(reason.clone()),
                _ => None,
            })
            .unwrap_or_default();

        Err(Error::ReconcileFailed {
            failed: self.failed(),
            total: self.total(),
            last_error,
        })
    }

    fn count(&self, predicate: impl Fn(&RecordOutcome) -> bool) -> usize {
        self.outcomes
            .values()
            .filter(|entry| predicate(&entry.outcome))
            .count()
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} unchanged, {} failed",
            self.created(),
            self.updated(),
            self.unchanged(),
            self.failed()
        )
    }
}
