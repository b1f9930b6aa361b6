// ============================================================================
// Order Domain - Tracked orders and their lifecycle rules
// ============================================================================
//
// - Value objects (OrderId, OperationMode, RemoteStatus, OrderRecord)
// - Events pushed by the controller (StatusChanged, QueueChanged)
// - Remote commands (EnqueueCommand, AcknowledgeCommand)
// - Errors (OrderError enum)
// - Cache and ledger (in-memory index + persisted snapshot)
// - Command Handler (create / acknowledge)
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod commands;
pub mod errors;
pub mod cache;
pub mod ledger;
pub mod command_handler;

// Re-export for convenience
pub use value_objects::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use cache::*;
pub use ledger::OrderLedger;
pub use command_handler::*;
