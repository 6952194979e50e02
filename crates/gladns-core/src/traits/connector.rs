// # Connector Trait
//
// The capability set the tick loop relies on. A connector is one
// authenticated session to a DNS backend plus the record snapshot loaded
// for it.
//
// ## Lifecycle
//
// ```text
// Unconnected ──connect()──▶ Connected
// ```
//
// `Connected` lasts for the process lifetime. A failed `connect` leaves the
// connector `Unconnected`; callers must stop rather than retry, because
// without a complete snapshot no create-vs-update decision is correct.
//
// ## Usage
//
// ```rust,ignore
// use gladns_core::Connector;
//
// let connector = registry.create(&backend_config)?;
// connector.connect().await?;
//
// let report = connector.update_state(&desired).await?;
// println!("{} created, {} updated", report.created(), report.updated());
// ```

use async_trait::async_trait;

use crate::config::BackendConfig;
use crate::reconcile::ReconcileReport;
use crate::state::NodeState;

/// Trait for connector implementations
///
/// The reconciler in [`crate::reconcile`] turns any
/// [`DnsBackend`](super::DnsBackend) into a `Connector`; the engine depends
/// only on this trait.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connector name (e.g., "digitalocean", "powerdns")
    fn name(&self) -> &'static str;

    /// Whether `connect` has completed successfully
    fn is_connected(&self) -> bool;

    /// Authenticate and load the initial record snapshot
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Connected; the snapshot holds every managed record
    /// - `Err(Error::Connection)`: Authentication or enumeration failed
    async fn connect(&self) -> Result<(), crate::Error>;

    /// Reconcile the provider against the desired node state
    ///
    /// Per-address failures are reported in the returned
    /// [`ReconcileReport`], not as an error.
    ///
    /// # Returns
    ///
    /// - `Ok(ReconcileReport)`: At least one address did not fail (or nothing to do)
    /// - `Err(Error::ReconcileFailed)`: Every attempted address failed
    /// - `Err(Error::NotConnected)`: Called before `connect`
    async fn update_state(&self, desired: &NodeState) -> Result<ReconcileReport, crate::Error>;

    /// Explicitly delete the record for one node
    ///
    /// Never inferred from a node missing in `desired`; this is the only
    /// path that deletes records.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Record deleted and evicted from the snapshot
    /// - `Err(Error::NotFound)`: No managed record exists for the address
    /// - `Err(Error::RecordOperation)`: The provider call failed; snapshot unchanged
    async fn remove_node(&self, address: &str) -> Result<(), crate::Error>;
}

/// Helper trait for constructing connectors from configuration
pub trait ConnectorFactory: Send + Sync {
    /// Create an unconnected Connector from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration specific to this backend
    ///
    /// # Returns
    ///
    /// A boxed Connector trait object
    fn create(&self, config: &BackendConfig) -> Result<Box<dyn Connector>, crate::Error>;
}
