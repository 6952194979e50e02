// # State
//
// The two pieces of state the reconciler works with:
//
// - `NodeState`: the desired address → IP mapping, rebuilt from the gateway
//   every tick and thrown away afterwards.
// - `RecordSnapshot`: a connector's cached view of the records it manages,
//   loaded at connect and kept current as provider calls succeed.

pub mod snapshot;

pub use snapshot::{CachedRecord, RecordSnapshot};

use std::collections::HashMap;
use std::net::IpAddr;

/// Desired state for one tick: network address → current IP
///
/// Keys are the addresses exactly as the gateway reported them; the
/// reconciler normalizes them.
pub type NodeState = HashMap<String, IpAddr>;
