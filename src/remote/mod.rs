// ============================================================================
// Remote Order Connection - Command/event channel to the lift controller
// ============================================================================
//
// - connection/ - The collaborator trait, snapshot and error types
// - simulated/  - In-process controller used by the demo binary and tests
//
// ============================================================================

mod connection;
mod simulated;

pub use connection::{with_timeout, RemoteError, RemoteOrderConnection, RemoteOrderSnapshot, SubscriptionId};
pub use simulated::{SimCommand, SimulatedController};
