//! Core traits for gladns
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`Connector`]: The contract the tick loop drives (connect, reconcile, remove)
//! - [`DnsBackend`]: Provider API calls a backend adapter exposes to the reconciler
//! - [`StateSource`]: Produces the desired [`NodeState`](crate::state::NodeState) each tick

pub mod connector;
pub mod dns_backend;
pub mod state_source;

pub use connector::{Connector, ConnectorFactory};
pub use dns_backend::{DnsBackend, ProviderRecord, MANAGED_RECORD_TYPE};
pub use state_source::StateSource;
