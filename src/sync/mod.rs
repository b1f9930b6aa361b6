// ============================================================================
// Synchronization - Keeping the local replica in line with the controller
// ============================================================================
//
// - synchronizer/ - One-shot startup reconciliation against remote state
// - reconciler/   - Applies pushed events and republishes them
//
// ============================================================================

mod synchronizer;
mod reconciler;

pub use synchronizer::{OrderSynchronizer, RemoteState, SyncReport};
pub use reconciler::{EventReconciler, Notification};
