//! Error types for gladns
//!
//! This module defines all error types used throughout the workspace.

use thiserror::Error;

/// Result type alias for gladns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for gladns
#[derive(Error, Debug)]
pub enum Error {
    /// Authentication or initial record enumeration failed
    ///
    /// Fatal: without a fully loaded snapshot no diff decision can be made.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A single create/update/delete call failed for one address
    #[error("Record operation failed for {address}: {message}")]
    RecordOperation {
        /// Network address the operation was for
        address: String,
        /// Underlying failure
        message: String,
    },

    /// Malformed gateway payload
    #[error("Decode error: {0}")]
    Decode(String),

    /// Gateway unreachable or answered with a non-success status
    #[error("Transport error: {0}")]
    Transport(String),

    /// The connector was used before a successful `connect`
    #[error("Connector '{0}' used before connect")]
    NotConnected(String),

    /// Every record attempted in one reconciliation pass failed
    #[error("All {total} record(s) failed to reconcile ({failed} failed), last error: {last_error}")]
    ReconcileFailed {
        /// Number of failed records
        failed: usize,
        /// Number of records attempted
        total: usize,
        /// The last failure observed
        last_error: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider API unreachable (request never got a response)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },
}

impl Error {
    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a record operation error
    pub fn record_operation(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RecordOperation {
            address: address.into(),
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this error must stop the process rather than a single tick
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::NotConnected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(Error::connection("bad token").is_fatal());
        assert!(Error::NotConnected("digitalocean".into()).is_fatal());
        assert!(!Error::transport("gateway down").is_fatal());
        assert!(!Error::record_operation("node1", "500").is_fatal());
    }

    #[test]
    fn test_record_operation_message_carries_address() {
        let err = Error::record_operation("node1", "rate limited");
        assert_eq!(
            err.to_string(),
            "Record operation failed for node1: rate limited"
        );
    }
}
