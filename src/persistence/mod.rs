// ============================================================================
// Persistence - Durable snapshot of the order cache
// ============================================================================

mod order_store;

pub use order_store::{OrderStore, StoreError};
