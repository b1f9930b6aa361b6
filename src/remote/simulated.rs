use actix::Recipient;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::domain::order::{
    AcknowledgeCommand, EnqueueCommand, OrderId, QueueChangeType, QueueChanged, RemoteStatus, StatusChanged,
};
use super::connection::{RemoteError, RemoteOrderConnection, RemoteOrderSnapshot, SubscriptionId};

// ============================================================================
// Simulated Controller - In-process stand-in for the lift controller
// ============================================================================
//
// Behaves like a controller with one queue:
// - enqueue assigns sequential ids and reports OrderAdded
// - acknowledge completes the lowest open order at the elevator/opening:
//   TaskDone, then OrderDeleted, and the order is archived as Historical
// - drivers let a test move orders behind the tracker's back
//
// ============================================================================

/// Commands that can be made to fail once with `fail_next`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimCommand {
    Connect,
    Enqueue,
    Acknowledge,
    Query,
}

#[derive(Default)]
struct SimState {
    connected: bool,
    next_id: i32,
    next_subscription: u64,
    orders: BTreeMap<OrderId, RemoteOrderSnapshot>,
    enqueued: Vec<EnqueueCommand>,
    acknowledged: Vec<AcknowledgeCommand>,
    queries: Vec<OrderId>,
    failures: HashMap<SimCommand, RemoteError>,
    status_subscribers: Vec<(SubscriptionId, Recipient<StatusChanged>)>,
    queue_subscribers: Vec<(SubscriptionId, Recipient<QueueChanged>)>,
}

pub struct SimulatedController {
    state: Mutex<SimState>,
}

impl Default for SimulatedController {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedController {
    pub fn new() -> Self {
        Self::with_first_id(1)
    }

    /// Start issuing ids at `first_id`.
    pub fn with_first_id(first_id: i32) -> Self {
        Self {
            state: Mutex::new(SimState {
                next_id: first_id,
                ..SimState::default()
            }),
        }
    }

    // Poisoning only happens if a test panicked mid-call; keep serving
    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make the next call of `command` fail with `error`.
    pub fn fail_next(&self, command: SimCommand, error: RemoteError) {
        self.state().failures.insert(command, error);
    }

    /// Put an order into the controller without going through `enqueue`.
    pub fn seed_order(&self, snapshot: RemoteOrderSnapshot) {
        let mut state = self.state();
        if snapshot.id.0 >= state.next_id {
            state.next_id = snapshot.id.0 + 1;
        }
        state.orders.insert(snapshot.id, snapshot);
    }

    pub fn snapshot(&self, id: OrderId) -> Option<RemoteOrderSnapshot> {
        self.state().orders.get(&id).cloned()
    }

    /// Change an order's status and push the event.
    pub fn set_status(&self, id: OrderId, status: RemoteStatus) -> bool {
        let event = {
            let mut state = self.state();
            let Some(order) = state.orders.get_mut(&id) else {
                return false;
            };
            order.status = status.clone();
            StatusChanged {
                order_id: id,
                status,
                reported_quantity: order.ack_quantity,
            }
        };
        self.emit_status_changed(event);
        true
    }

    /// Archive an order as Historical without pushing any event, as if the
    /// tracker had been offline when it completed.
    pub fn archive(&self, id: OrderId, ack_quantity: f64) -> bool {
        let mut state = self.state();
        match state.orders.get_mut(&id) {
            Some(order) => {
                order.status = RemoteStatus::historical();
                order.ack_quantity = ack_quantity;
                true
            }
            None => false,
        }
    }

    /// Drop all knowledge of an order without pushing any event.
    pub fn forget(&self, id: OrderId) -> bool {
        self.state().orders.remove(&id).is_some()
    }

    /// Finish an order the way the controller does after an acknowledgement.
    pub fn complete(&self, id: OrderId, ack_quantity: f64) -> bool {
        {
            let mut state = self.state();
            let Some(order) = state.orders.get_mut(&id) else {
                return false;
            };
            order.ack_quantity = ack_quantity;
            order.status = RemoteStatus::task_done();
        }

        self.emit_status_changed(StatusChanged {
            order_id: id,
            status: RemoteStatus::task_done(),
            reported_quantity: ack_quantity,
        });

        if let Some(order) = self.state().orders.get_mut(&id) {
            order.status = RemoteStatus::historical();
        }

        self.emit_queue_changed(QueueChanged {
            order_id: id,
            change_type: QueueChangeType::OrderDeleted,
        });
        true
    }

    pub fn emit_status_changed(&self, event: StatusChanged) {
        let recipients: Vec<Recipient<StatusChanged>> =
            self.state().status_subscribers.iter().map(|(_, r)| r.clone()).collect();

        tracing::trace!(order_id = %event.order_id, status = %event.status, receivers = recipients.len(), "Pushing status change");

        for recipient in recipients {
            recipient.do_send(event.clone());
        }
    }

    pub fn emit_queue_changed(&self, event: QueueChanged) {
        let recipients: Vec<Recipient<QueueChanged>> =
            self.state().queue_subscribers.iter().map(|(_, r)| r.clone()).collect();

        tracing::trace!(order_id = %event.order_id, change = %event.change_type, receivers = recipients.len(), "Pushing queue change");

        for recipient in recipients {
            recipient.do_send(event.clone());
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state().connected
    }

    pub fn enqueued(&self) -> Vec<EnqueueCommand> {
        self.state().enqueued.clone()
    }

    pub fn acknowledgements(&self) -> Vec<AcknowledgeCommand> {
        self.state().acknowledged.clone()
    }

    pub fn queries(&self) -> Vec<OrderId> {
        self.state().queries.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        let state = self.state();
        state.status_subscribers.len() + state.queue_subscribers.len()
    }

    fn check(state: &mut SimState, command: SimCommand) -> Result<(), RemoteError> {
        if let Some(error) = state.failures.remove(&command) {
            return Err(error);
        }
        if command != SimCommand::Connect && !state.connected {
            return Err(RemoteError::NotConnected);
        }
        Ok(())
    }

    fn next_subscription(state: &mut SimState) -> SubscriptionId {
        state.next_subscription += 1;
        SubscriptionId(state.next_subscription)
    }
}

#[async_trait]
impl RemoteOrderConnection for SimulatedController {
    async fn connect(&self, address: &str) -> Result<(), RemoteError> {
        let mut state = self.state();
        Self::check(&mut state, SimCommand::Connect)?;
        state.connected = true;
        tracing::debug!(address = %address, "Simulated controller connected");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), RemoteError> {
        self.state().connected = false;
        tracing::debug!("Simulated controller disconnected");
        Ok(())
    }

    async fn enqueue(&self, command: EnqueueCommand) -> Result<OrderId, RemoteError> {
        let id = {
            let mut state = self.state();
            Self::check(&mut state, SimCommand::Enqueue)?;

            let id = OrderId(state.next_id);
            state.next_id += 1;
            state.orders.insert(
                id,
                RemoteOrderSnapshot {
                    id,
                    status: RemoteStatus::selected(),
                    mode: command.mode,
                    elevator: command.elevator.clone(),
                    opening: command.opening,
                    quantity: command.quantity,
                    ack_quantity: 0.0,
                },
            );
            state.enqueued.push(command);
            id
        };

        self.emit_queue_changed(QueueChanged {
            order_id: id,
            change_type: QueueChangeType::OrderAdded,
        });

        Ok(id)
    }

    async fn acknowledge(&self, command: AcknowledgeCommand) -> Result<(), RemoteError> {
        let target = {
            let mut state = self.state();
            Self::check(&mut state, SimCommand::Acknowledge)?;
            state.acknowledged.push(command.clone());

            state
                .orders
                .values()
                .find(|o| o.elevator == command.elevator && o.opening == command.opening && !o.status.is_terminal())
                .map(|o| o.id)
        };

        match target {
            Some(id) => {
                self.complete(id, command.quantity);
                Ok(())
            }
            None => Err(RemoteError::Rejected(format!(
                "no open order at {} opening {}",
                command.elevator, command.opening
            ))),
        }
    }

    async fn query_order(&self, id: OrderId) -> Result<Option<RemoteOrderSnapshot>, RemoteError> {
        let mut state = self.state();
        Self::check(&mut state, SimCommand::Query)?;
        state.queries.push(id);
        Ok(state.orders.get(&id).cloned())
    }

    fn subscribe_status_changed(&self, recipient: Recipient<StatusChanged>) -> SubscriptionId {
        let mut state = self.state();
        let id = Self::next_subscription(&mut state);
        state.status_subscribers.push((id, recipient));
        id
    }

    fn subscribe_queue_changed(&self, recipient: Recipient<QueueChanged>) -> SubscriptionId {
        let mut state = self.state();
        let id = Self::next_subscription(&mut state);
        state.queue_subscribers.push((id, recipient));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.state();
        let before = state.status_subscribers.len() + state.queue_subscribers.len();
        state.status_subscribers.retain(|(sub, _)| *sub != id);
        state.queue_subscribers.retain(|(sub, _)| *sub != id);
        before != state.status_subscribers.len() + state.queue_subscribers.len()
    }
}
