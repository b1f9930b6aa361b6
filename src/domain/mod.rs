// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Orders are owned here; articles belong to the inventory collaborator and
// are only referenced and adjusted.
//
// ============================================================================

pub mod order;
pub mod article;
