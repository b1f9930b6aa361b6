use actix::Recipient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::domain::order::{
    AcknowledgeCommand, EnqueueCommand, OperationMode, OrderId, QueueChanged, RemoteStatus, StatusChanged,
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RemoteError {
    #[error("Controller unreachable at {0}")]
    Unreachable(String),

    #[error("Not connected to controller")]
    NotConnected,

    #[error("Command rejected by controller: {0}")]
    Rejected(String),

    #[error("Command timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// The controller's view of one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteOrderSnapshot {
    pub id: OrderId,
    pub status: RemoteStatus,
    pub mode: OperationMode,
    pub elevator: String,
    pub opening: u32,
    pub quantity: f64,
    pub ack_quantity: f64,
}

/// Handle returned by the subscribe calls; pass it back to `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Command/event channel to the remote order controller.
///
/// Commands resolve when the controller answers. Events are delivered to
/// subscribed recipients from whatever context the implementation runs on.
#[async_trait]
pub trait RemoteOrderConnection: Send + Sync {
    async fn connect(&self, address: &str) -> Result<(), RemoteError>;

    async fn disconnect(&self) -> Result<(), RemoteError>;

    /// Queue an order; the controller answers with the order's id.
    async fn enqueue(&self, command: EnqueueCommand) -> Result<OrderId, RemoteError>;

    async fn acknowledge(&self, command: AcknowledgeCommand) -> Result<(), RemoteError>;

    /// `Ok(None)` when the controller has never seen the id.
    async fn query_order(&self, id: OrderId) -> Result<Option<RemoteOrderSnapshot>, RemoteError>;

    fn subscribe_status_changed(&self, recipient: Recipient<StatusChanged>) -> SubscriptionId;

    fn subscribe_queue_changed(&self, recipient: Recipient<QueueChanged>) -> SubscriptionId;

    /// Returns false if the subscription was not active.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

/// Run a remote call, bounded by `timeout` when one is configured.
pub async fn with_timeout<T, F>(timeout: Option<Duration>, call: F) -> Result<T, RemoteError>
where
    F: Future<Output = Result<T, RemoteError>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(RemoteError::TimedOut(limit))),
        None => call.await,
    }
}
