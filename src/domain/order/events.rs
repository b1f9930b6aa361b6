use actix::Message;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::value_objects::{OrderId, RemoteStatus};

// ============================================================================
// Order Events - Pushed by the remote controller
// ============================================================================

/// An order's status changed on the controller.
#[derive(Message, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[rtype(result = "()")]
pub struct StatusChanged {
    pub order_id: OrderId,
    pub status: RemoteStatus,
    /// Acknowledged quantity as reported by the controller
    pub reported_quantity: f64,
}

/// The controller's order queue changed.
#[derive(Message, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[rtype(result = "()")]
pub struct QueueChanged {
    pub order_id: OrderId,
    pub change_type: QueueChangeType,
}

/// Kind of queue change. Only `OrderDeleted` has a local effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueChangeType {
    OrderAdded,
    OrderChanged,
    OrderDeleted,
    Other(String),
}

impl fmt::Display for QueueChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueChangeType::OrderAdded => f.write_str("OrderAdded"),
            QueueChangeType::OrderChanged => f.write_str("OrderChanged"),
            QueueChangeType::OrderDeleted => f.write_str("OrderDeleted"),
            QueueChangeType::Other(kind) => f.write_str(kind),
        }
    }
}

/// Notification republished to UI subscribers after local effects are applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderNotification {
    StatusChanged(StatusChanged),
    QueueChanged(QueueChanged),
}

impl OrderNotification {
    pub fn order_id(&self) -> OrderId {
        match self {
            OrderNotification::StatusChanged(e) => e.order_id,
            OrderNotification::QueueChanged(e) => e.order_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            OrderNotification::StatusChanged(_) => "OrderStatusChanged",
            OrderNotification::QueueChanged(_) => "QueueChanged",
        }
    }
}
