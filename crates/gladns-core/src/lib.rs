// # gladns-core
//
// Core library keeping DNS A records in line with the state of a
// peer-to-peer gateway network.
//
// ## Architecture Overview
//
// - **StateSource**: Trait for fetching the desired node state (address -> IP)
// - **DnsBackend**: Trait for the record CRUD calls of one DNS provider
// - **Connector**: Trait for the connect / update_state / remove_node contract
// - **Reconciler**: Generic Connector over any DnsBackend (snapshot + diff)
// - **SyncEngine**: Tick loop driving StateSource -> Connector
// - **ConnectorRegistry**: Explicit table of connector factories by name
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Provider API plumbing lives in backend crates
// 2. **Tick-Driven**: Desired state is polled, never pushed
// 3. **Plugin-Based**: Connectors are registered by name, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Idempotency**: Unchanged records cause no provider writes

pub mod traits;
pub mod engine;
pub mod registry;
pub mod config;
pub mod error;
pub mod state;
pub mod naming;
pub mod reconcile;

// Re-export core types for convenience
pub use traits::{Connector, ConnectorFactory, DnsBackend, ProviderRecord, StateSource};
pub use engine::{EngineEvent, SyncEngine};
pub use registry::ConnectorRegistry;
pub use config::{BackendConfig, EngineConfig, GatewayConfig, GladnsConfig};
pub use error::{Error, Result};
pub use state::{CachedRecord, NodeState, RecordSnapshot};
pub use naming::NameScheme;
pub use reconcile::{ReconcileReport, Reconciler, RecordOutcome};
