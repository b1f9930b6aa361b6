// ============================================================================
// Article Domain - Inventory collaborator consulted on order completion
// ============================================================================

pub mod value_objects;
pub mod inventory;

pub use value_objects::*;
pub use inventory::*;
