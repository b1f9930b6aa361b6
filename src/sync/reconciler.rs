use tokio::sync::broadcast;

use crate::domain::order::{OrderLedger, OrderNotification, QueueChangeType, QueueChanged, StatusChanged};
use crate::events::EventEnvelope;

// ============================================================================
// Event Reconciler - Applies pushed controller events
// ============================================================================
//
// Events for orders this client does not track are dropped silently: the
// controller reports on every order in its queue, not just ours. Events
// that change local state are persisted first and only then republished.
//
// ============================================================================

pub type Notification = EventEnvelope<OrderNotification>;

pub struct EventReconciler {
    sender: broadcast::Sender<Notification>,
    sequence: u64,
}

impl EventReconciler {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender, sequence: 0 }
    }

    /// Attach a new outward subscriber. Dropping the receiver detaches it.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    pub fn sender(&self) -> broadcast::Sender<Notification> {
        self.sender.clone()
    }

    /// Returns true when the event changed local state.
    pub fn on_status_changed(&mut self, ledger: &mut OrderLedger, event: StatusChanged) -> bool {
        if !ledger.contains(event.order_id) {
            tracing::debug!(order_id = %event.order_id, status = %event.status, "Ignoring status change for untracked order");
            ledger.metrics().record_event("status_changed", false);
            return false;
        }

        let already_done = ledger
            .get(event.order_id)
            .is_some_and(|record| record.status.is_task_done());

        let record = match ledger.cache_mut().update_status(event.order_id, event.status.clone()) {
            Ok(record) => record.clone(),
            Err(e) => {
                tracing::error!(error = %e, "Tracked order vanished during status update");
                return false;
            }
        };

        tracing::info!(order_id = %event.order_id, status = %event.status, "Order status changed");

        // The order stays cached until the controller deletes it from the queue
        if event.status.is_task_done() && !already_done {
            ledger.apply_completion(&record, event.reported_quantity);
        }

        ledger.persist();
        ledger.metrics().record_event("status_changed", true);
        self.publish(OrderNotification::StatusChanged(event));
        true
    }

    /// Returns true when the event changed local state.
    pub fn on_queue_changed(&mut self, ledger: &mut OrderLedger, event: QueueChanged) -> bool {
        if event.change_type != QueueChangeType::OrderDeleted {
            tracing::trace!(order_id = %event.order_id, change = %event.change_type, "Queue change has no local effect");
            ledger.metrics().record_event("queue_changed", false);
            return false;
        }

        if ledger.remove(event.order_id).is_none() {
            tracing::debug!(order_id = %event.order_id, "Ignoring deletion of untracked order");
            ledger.metrics().record_event("queue_changed", false);
            return false;
        }

        tracing::info!(order_id = %event.order_id, "Order removed from controller queue");

        ledger.metrics().record_event("queue_changed", true);
        self.publish(OrderNotification::QueueChanged(event));
        true
    }

    fn publish(&mut self, notification: OrderNotification) {
        self.sequence += 1;
        let envelope = EventEnvelope::new(self.sequence, notification.event_type(), notification);

        if let Err(e) = self.sender.send(envelope) {
            tracing::trace!(order_id = %e.0.event_data.order_id(), "No notification subscribers attached");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::article::{ArticleId, ArticleInventory};
    use crate::domain::order::ledger::tests::{inventory_with, ledger, record, temp_store};
    use crate::domain::order::{OperationMode, OrderId, RemoteStatus};

    fn status(id: i32, status: RemoteStatus, quantity: f64) -> StatusChanged {
        StatusChanged {
            order_id: OrderId(id),
            status,
            reported_quantity: quantity,
        }
    }

    fn deleted(id: i32) -> QueueChanged {
        QueueChanged {
            order_id: OrderId(id),
            change_type: QueueChangeType::OrderDeleted,
        }
    }

    #[test]
    fn test_task_done_out_decrements_and_keeps_order() {
        let (_dir, store) = temp_store();
        let inventory = inventory_with(100.0);
        let mut ledger = ledger(store.clone(), inventory.clone());
        ledger.insert(record(1, 1, OperationMode::Out)).unwrap();
        let mut reconciler = EventReconciler::new(16);
        let mut rx = reconciler.subscribe();

        assert!(reconciler.on_status_changed(&mut ledger, status(1, RemoteStatus::task_done(), 30.0)));

        assert_eq!(inventory.get(ArticleId(1)).unwrap().quantity, 70.0);
        assert!(ledger.get(OrderId(1)).unwrap().status.is_task_done());
        assert!(store.load().unwrap()[0].status.is_task_done());

        let notification = rx.try_recv().unwrap();
        assert_eq!(notification.sequence_number, 1);
        assert_eq!(notification.event_type, "OrderStatusChanged");

        assert!(reconciler.on_queue_changed(&mut ledger, deleted(1)));
        assert!(ledger.is_empty());
        assert!(store.load().unwrap().is_empty());
        assert_eq!(rx.try_recv().unwrap().event_type, "QueueChanged");
    }

    #[test]
    fn test_repeated_task_done_applies_once() {
        let inventory = inventory_with(100.0);
        let (_dir, store) = temp_store();
        let mut ledger = ledger(store, inventory.clone());
        ledger.insert(record(2, 1, OperationMode::Out)).unwrap();
        let mut reconciler = EventReconciler::new(16);

        reconciler.on_status_changed(&mut ledger, status(2, RemoteStatus::task_done(), 30.0));
        reconciler.on_status_changed(&mut ledger, status(2, RemoteStatus::task_done(), 30.0));

        assert_eq!(inventory.get(ArticleId(1)).unwrap().quantity, 70.0);
    }

    #[test]
    fn test_task_done_inv_sets_absolute_quantity() {
        let inventory = inventory_with(100.0);
        let (_dir, store) = temp_store();
        let mut ledger = ledger(store, inventory.clone());
        ledger.insert(record(3, 2, OperationMode::Inv)).unwrap();
        let mut reconciler = EventReconciler::new(16);

        reconciler.on_status_changed(&mut ledger, status(3, RemoteStatus::task_done(), 55.0));

        assert_eq!(inventory.get(ArticleId(2)).unwrap().quantity, 55.0);
    }

    #[test]
    fn test_non_terminal_status_leaves_inventory() {
        let inventory = inventory_with(100.0);
        let (_dir, store) = temp_store();
        let mut ledger = ledger(store, inventory.clone());
        ledger.insert(record(3, 1, OperationMode::Out)).unwrap();
        let mut reconciler = EventReconciler::new(16);

        assert!(reconciler.on_status_changed(&mut ledger, status(3, RemoteStatus::new("Active"), 9.0)));

        assert_eq!(inventory.get(ArticleId(1)).unwrap().quantity, 100.0);
        assert_eq!(ledger.get(OrderId(3)).unwrap().status.as_str(), "Active");
    }

    #[test]
    fn test_untracked_events_change_nothing() {
        let (_dir, store) = temp_store();
        let inventory = inventory_with(100.0);
        let mut ledger = ledger(store.clone(), inventory.clone());
        ledger.insert(record(1, 1, OperationMode::Out)).unwrap();
        let before = std::fs::read(store.path()).unwrap();
        let mut reconciler = EventReconciler::new(16);
        let mut rx = reconciler.subscribe();

        assert!(!reconciler.on_status_changed(&mut ledger, status(99, RemoteStatus::task_done(), 30.0)));
        assert!(!reconciler.on_queue_changed(&mut ledger, deleted(99)));

        assert_eq!(ledger.len(), 1);
        assert_eq!(inventory.get(ArticleId(1)).unwrap().quantity, 100.0);
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_other_queue_changes_are_ignored() {
        let (_dir, store) = temp_store();
        let mut ledger = ledger(store, inventory_with(100.0));
        ledger.insert(record(1, 1, OperationMode::Out)).unwrap();
        let mut reconciler = EventReconciler::new(16);
        let mut rx = reconciler.subscribe();

        for change_type in [
            QueueChangeType::OrderAdded,
            QueueChangeType::OrderChanged,
            QueueChangeType::Other("Reordered".to_string()),
        ] {
            assert!(!reconciler.on_queue_changed(&mut ledger, QueueChanged { order_id: OrderId(1), change_type }));
        }

        assert!(ledger.contains(OrderId(1)));
        assert!(rx.try_recv().is_err());
    }
}
