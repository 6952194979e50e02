// # State Source Trait
//
// Defines where the desired node state comes from each tick.
//
// ## Implementations
//
// - Gateway HTTP poller: `gladns-gateway` crate
//
// A state source is polled by the engine; it never schedules itself and
// never talks to a DNS backend.

use async_trait::async_trait;

use crate::state::NodeState;

/// Trait for desired-state providers
#[async_trait]
pub trait StateSource: Send + Sync {
    /// Fetch the current node state
    ///
    /// # Returns
    ///
    /// - `Ok(NodeState)`: Freshly observed address → IP mapping
    /// - `Err(Error::Transport)`: The source was unreachable
    /// - `Err(Error::Decode)`: The source answered with a malformed payload
    async fn fetch(&self) -> Result<NodeState, crate::Error>;

    /// Human-readable description of the source (for logging)
    fn describe(&self) -> String;
}
