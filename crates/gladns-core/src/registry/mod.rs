//! Connector registry
//!
//! The registry maps connector names to factories so the daemon can pick a
//! DNS backend by name without hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gladns_core::registry::ConnectorRegistry;
//!
//! let mut registry = ConnectorRegistry::new();
//! gladns_provider_digitalocean::register(&mut registry);
//!
//! let connector = registry.create(&config.backend)?;
//! ```
//!
//! ## Registration
//!
//! Backend crates expose a `register` function:
//!
//! ```rust,ignore
//! pub fn register(registry: &mut ConnectorRegistry) {
//!     registry.register("digitalocean", Box::new(DigitalOceanFactory));
//! }
//! ```
//!
//! The registry is built explicitly at startup and passed around by value;
//! there is no process-wide table.

use std::collections::BTreeMap;

use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::traits::{Connector, ConnectorFactory};

/// Name-indexed table of connector factories
#[derive(Default)]
pub struct ConnectorRegistry {
    factories: BTreeMap<String, Box<dyn ConnectorFactory>>,
}

impl ConnectorRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connector factory
    ///
    /// Registering the same name twice replaces the previous factory.
    ///
    /// # Parameters
    ///
    /// - `name`: Connector name (e.g., "digitalocean", "powerdns")
    /// - `factory`: Factory object for creating connector instances
    pub fn register(&mut self, name: impl Into<String>, factory: Box<dyn ConnectorFactory>) {
        self.factories.insert(name.into(), factory);
    }

    /// Create an unconnected connector from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn Connector>)`: Created connector
    /// - `Err(Error)`: If the backend type is not registered or creation fails
    pub fn create(&self, config: &BackendConfig) -> Result<Box<dyn Connector>> {
        let name = config.type_name();

        let factory = self.factories.get(name).ok_or_else(|| {
            Error::config(format!(
                "Unknown connector: {} (registered: {})",
                name,
                self.list().join(", ")
            ))
        })?;

        factory.create(config)
    }

    /// Registered connector names, sorted
    pub fn list(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Check if a connector name is registered
    pub fn has(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}
