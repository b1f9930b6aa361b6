use serde::{Deserialize, Serialize};

use super::value_objects::OperationMode;

// ============================================================================
// Remote Commands - What the tracker asks the controller to do
// ============================================================================

/// Add an order to the controller's queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnqueueCommand {
    pub transaction_tag: String,
    pub elevator: String,
    pub tray: u32,
    pub tray_coordinate: String,
    pub opening: u32,
    pub article_no: String,
    pub article_desc: String,
    pub mode: OperationMode,
    pub no_return_of_tray: u32,
    pub priority: u32,
    pub quantity: f64,
    pub activate: bool,
}

/// Confirm the order presented at an elevator opening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcknowledgeCommand {
    pub elevator: String,
    pub opening: u32,
    pub quantity: f64,
    /// Always false from the tracker: the quantity is explicit
    pub use_panel_quantity: bool,
}
