use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::article::ArticleId;
use super::errors::OrderError;

// ============================================================================
// Order Value Objects
// ============================================================================

/// Order identifier issued by the remote controller.
///
/// Local and remote identifiers are the same value once an order exists,
/// so a single newtype covers both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub i32);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the remote controller does with the tray when the order runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationMode {
    /// Pick out, decrements inventory
    #[serde(rename = "OUT")]
    Out,
    /// Put in, increments inventory
    #[serde(rename = "IN")]
    In,
    /// Inventory count, sets the quantity absolutely
    #[serde(rename = "INV")]
    Inv,
}

impl OperationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationMode::Out => "OUT",
            OperationMode::In => "IN",
            OperationMode::Inv => "INV",
        }
    }

    /// Apply a reported quantity to a current article quantity.
    ///
    /// OUT and IN are deltas, INV is an absolute assignment. No clamping.
    pub fn apply(&self, current: f64, reported: f64) -> f64 {
        match self {
            OperationMode::Out => current - reported,
            OperationMode::In => current + reported,
            OperationMode::Inv => reported,
        }
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationMode {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OUT" => Ok(OperationMode::Out),
            "IN" => Ok(OperationMode::In),
            "INV" => Ok(OperationMode::Inv),
            other => Err(OrderError::InvalidDraft(format!("unknown operation mode '{}'", other))),
        }
    }
}

/// Status string as reported by the remote controller.
///
/// Kept free-form: the remote vocabulary is larger than the handful of
/// values the tracker reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteStatus(String);

impl RemoteStatus {
    pub const SELECTED: &'static str = "Selected";
    pub const TASK_DONE: &'static str = "TaskDone";
    pub const HISTORICAL: &'static str = "Historical";

    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    pub fn selected() -> Self {
        Self::new(Self::SELECTED)
    }

    pub fn task_done() -> Self {
        Self::new(Self::TASK_DONE)
    }

    pub fn historical() -> Self {
        Self::new(Self::HISTORICAL)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_task_done(&self) -> bool {
        self.0 == Self::TASK_DONE
    }

    pub fn is_historical(&self) -> bool {
        self.0 == Self::HISTORICAL
    }

    /// TaskDone and Historical end an order's life in the local cache.
    pub fn is_terminal(&self) -> bool {
        self.is_task_done() || self.is_historical()
    }
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A submitted order as tracked locally.
///
/// Field names follow the `MyOrders.dat` layout so files written by the
/// earlier desktop client load unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderRecord {
    pub id: OrderId,
    #[serde(rename = "CTOrderId")]
    pub remote_id: OrderId,
    pub article_id: ArticleId,
    pub article_no: String,
    pub article_desc: String,
    pub elevator: String,
    pub tray_no: u32,
    pub quantity: f64,
    pub service_opening: u32,
    pub operation: OperationMode,
    #[serde(rename = "CTStatus")]
    pub status: RemoteStatus,
}

/// User input for a new order, before the article is resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub article_id: ArticleId,
    pub quantity: f64,
    pub service_opening: u32,
    pub operation: OperationMode,
}

impl OrderDraft {
    pub fn new(article_id: ArticleId, operation: OperationMode, quantity: f64, service_opening: u32) -> Self {
        Self {
            article_id,
            quantity,
            service_opening,
            operation,
        }
    }

    /// Validate the draft against the number of service openings on the lift.
    pub fn validate(&self, service_openings: u32) -> Result<(), OrderError> {
        if self.service_opening == 0 || self.service_opening > service_openings {
            return Err(OrderError::InvalidDraft(format!(
                "service opening {} outside 1..={}",
                self.service_opening, service_openings
            )));
        }

        if !self.quantity.is_finite() || self.quantity < 0.0 {
            return Err(OrderError::InvalidQuantity(self.quantity));
        }

        // INV orders carry no requested quantity; the count arrives on acknowledge
        if self.operation != OperationMode::Inv && self.quantity == 0.0 {
            return Err(OrderError::InvalidDraft(format!(
                "{} order needs a positive quantity",
                self.operation
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
