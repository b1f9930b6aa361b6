use actix::prelude::*;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::actors::{
    AcknowledgeOrder, CreateOrder, GetArticle, GetArticles, GetOrder, GetOrders, OrderTrackerActor, Shutdown,
    Synchronize,
};
use crate::config::TrackerConfig;
use crate::domain::article::{ArticleId, ArticleInventory, ArticleRecord};
use crate::domain::order::{OrderDraft, OrderId, OrderLedger, OrderRecord};
use crate::error::{TrackerError, TrackerResult};
use crate::metrics::Metrics;
use crate::persistence::OrderStore;
use crate::remote::{with_timeout, RemoteOrderConnection};
use crate::sync::Notification;

/// Handle to a running order tracker.
///
/// Cheap to clone; every clone talks to the same tracker. Must be created
/// inside an actix system.
#[derive(Clone)]
pub struct OrderTracker {
    addr: Addr<OrderTrackerActor>,
    notifications: broadcast::Sender<Notification>,
}

impl OrderTracker {
    /// Connect, load the persisted orders and reconcile them with the
    /// controller. Returns once the tracker is consistent and live.
    pub async fn start(
        config: &TrackerConfig,
        remote: Arc<dyn RemoteOrderConnection>,
        inventory: Arc<dyn ArticleInventory>,
        metrics: Arc<Metrics>,
    ) -> TrackerResult<Self> {
        tracing::info!(address = %config.remote_address, "Connecting to order controller");
        with_timeout(config.command_timeout, remote.connect(&config.remote_address))
            .await
            .map_err(TrackerError::ConnectionFailure)?;

        let ledger = match OrderLedger::open(OrderStore::new(&config.store_path), inventory, metrics) {
            Ok(ledger) => ledger,
            Err(e) => {
                tracing::error!(error = %e, path = %config.store_path.display(), "Could not load persisted orders");
                if let Err(disconnect) = remote.disconnect().await {
                    tracing::warn!(error = %disconnect, "Disconnect after failed load also failed");
                }
                return Err(e);
            }
        };

        let actor = OrderTrackerActor::new(ledger, remote.clone(), config);
        let notifications = actor.notifications();
        let tracker = Self {
            addr: actor.start(),
            notifications,
        };

        let synced = match tracker.addr.send(Synchronize).await {
            Ok(result) => result,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = synced {
            tracker.release(remote.as_ref()).await;
            return Err(e);
        }

        tracing::info!("🚀 Order tracker is live");
        Ok(tracker)
    }

    /// All tracked orders, ordered by id.
    pub async fn orders(&self) -> TrackerResult<Vec<OrderRecord>> {
        Ok(self.addr.send(GetOrders).await?)
    }

    pub async fn order(&self, order_id: OrderId) -> TrackerResult<Option<OrderRecord>> {
        Ok(self.addr.send(GetOrder { order_id }).await?)
    }

    pub async fn articles(&self) -> TrackerResult<Vec<ArticleRecord>> {
        Ok(self.addr.send(GetArticles).await?)
    }

    pub async fn article(&self, article_id: ArticleId) -> TrackerResult<Option<ArticleRecord>> {
        Ok(self.addr.send(GetArticle { article_id }).await?)
    }

    /// Enqueue a new order on the controller and start tracking it.
    pub async fn create_order(&self, draft: OrderDraft) -> TrackerResult<OrderRecord> {
        self.addr.send(CreateOrder { draft }).await?
    }

    /// Confirm a tracked order with the quantity actually moved.
    ///
    /// Success only means the controller took the acknowledgement; the
    /// inventory changes when its completion event comes back.
    pub async fn acknowledge_order(&self, order_id: OrderId, quantity: f64) -> TrackerResult<()> {
        self.addr.send(AcknowledgeOrder { order_id, quantity }).await?
    }

    /// Stream of applied changes, published after they are persisted.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Stop receiving remote events and disconnect.
    pub async fn shutdown(&self) -> TrackerResult<()> {
        self.addr.send(Shutdown).await?
    }

    pub fn is_running(&self) -> bool {
        self.addr.connected()
    }

    /// Tear down after a failed start. Disconnects directly when the actor
    /// is already gone.
    async fn release(&self, remote: &dyn RemoteOrderConnection) {
        match self.shutdown().await {
            Ok(()) => {}
            Err(TrackerError::Unavailable(_)) => {
                if let Err(e) = remote.disconnect().await {
                    tracing::warn!(error = %e, "Disconnect after failed start also failed");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Shutdown after failed start also failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::article::InMemoryInventory;
    use crate::domain::order::{
        OperationMode, OrderError, QueueChangeType, QueueChanged, RemoteStatus, StatusChanged,
    };
    use crate::remote::{RemoteError, RemoteOrderSnapshot, SimCommand, SimulatedController};
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    struct Harness {
        _dir: TempDir,
        sim: Arc<SimulatedController>,
        inventory: Arc<InMemoryInventory>,
        config: TrackerConfig,
    }

    impl Harness {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            let store = dir.path().join("MyOrders.dat");
            Self {
                _dir: dir,
                sim: Arc::new(SimulatedController::new()),
                inventory: Arc::new(InMemoryInventory::new((1..=3).map(|i| ArticleRecord {
                    id: ArticleId(i),
                    article_no: format!("A-{}", i),
                    article_desc: format!("Article {}", i),
                    elevator: "Sim_1".to_string(),
                    tray_no: i as u32,
                    quantity: 100.0,
                }))),
                config: TrackerConfig::default().with_store_path(store),
            }
        }

        async fn start(&self) -> TrackerResult<OrderTracker> {
            OrderTracker::start(
                &self.config,
                self.sim.clone(),
                self.inventory.clone(),
                Arc::new(Metrics::new().unwrap()),
            )
            .await
        }

        fn quantity(&self, id: i32) -> f64 {
            self.inventory.get(ArticleId(id)).unwrap().quantity
        }

        fn persisted(&self) -> Vec<OrderRecord> {
            OrderStore::new(&self.config.store_path).load().unwrap()
        }
    }

    fn draft(article: i32, mode: OperationMode, quantity: f64, opening: u32) -> OrderDraft {
        OrderDraft::new(ArticleId(article), mode, quantity, opening)
    }

    #[actix::test]
    async fn test_create_order_is_tracked_and_persisted() {
        let h = Harness::new();
        let tracker = h.start().await.unwrap();

        let record = tracker.create_order(draft(1, OperationMode::Out, 5.0, 2)).await.unwrap();

        assert_eq!(record.id, record.remote_id);
        assert_eq!(record.status, RemoteStatus::selected());
        assert_eq!(record.article_no, "A-1");
        assert_eq!(tracker.orders().await.unwrap(), vec![record.clone()]);
        assert_eq!(h.persisted(), vec![record]);

        let sent = h.sim.enqueued();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].transaction_tag, "MiniWMS:1");
        assert_eq!(sent[0].opening, 2);
        assert_eq!(sent[0].elevator, "Sim_1");
    }

    #[actix::test]
    async fn test_create_for_unknown_article_never_reaches_controller() {
        let h = Harness::new();
        let tracker = h.start().await.unwrap();

        let err = tracker.create_order(draft(42, OperationMode::In, 1.0, 1)).await.unwrap_err();

        assert_eq!(err.as_order_error(), Some(&OrderError::ArticleNotFound(ArticleId(42))));
        assert!(h.sim.enqueued().is_empty());
        assert!(tracker.orders().await.unwrap().is_empty());
    }

    #[actix::test]
    async fn test_acknowledge_untracked_order_fails_locally() {
        let h = Harness::new();
        let tracker = h.start().await.unwrap();

        let err = tracker.acknowledge_order(OrderId(77), 3.0).await.unwrap_err();

        assert_eq!(err.as_order_error(), Some(&OrderError::OrderNotFound(OrderId(77))));
        assert!(h.sim.acknowledgements().is_empty());
    }

    #[actix::test]
    async fn test_acknowledged_out_order_completes() {
        let h = Harness::new();
        let tracker = h.start().await.unwrap();
        let mut rx = tracker.subscribe();

        let record = tracker.create_order(draft(1, OperationMode::Out, 40.0, 1)).await.unwrap();
        tracker.acknowledge_order(record.id, 30.0).await.unwrap();

        // Completion events were queued behind the acknowledgement
        assert!(tracker.orders().await.unwrap().is_empty());
        assert_eq!(h.quantity(1), 70.0);
        assert!(h.persisted().is_empty());

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.event_type, "OrderStatusChanged");
        assert_eq!(second.event_type, "QueueChanged");
        assert!(second.sequence_number > first.sequence_number);
    }

    #[actix::test]
    async fn test_inventory_count_sets_quantity() {
        let h = Harness::new();
        let tracker = h.start().await.unwrap();

        let record = tracker.create_order(draft(2, OperationMode::Inv, 0.0, 3)).await.unwrap();
        tracker.acknowledge_order(record.id, 55.0).await.unwrap();

        assert_eq!(tracker.article(ArticleId(2)).await.unwrap().unwrap().quantity, 55.0);
    }

    #[actix::test]
    async fn test_orders_completed_offline_are_reconciled_on_start() {
        let h = Harness::new();
        let first = h.start().await.unwrap();
        let finished = first.create_order(draft(1, OperationMode::In, 12.0, 1)).await.unwrap();
        let open = first.create_order(draft(2, OperationMode::Out, 4.0, 2)).await.unwrap();
        let lost = first.create_order(draft(3, OperationMode::Out, 4.0, 3)).await.unwrap();
        first.shutdown().await.unwrap();

        h.sim.archive(finished.id, 12.0);
        h.sim.forget(lost.id);

        let second = h.start().await.unwrap();

        let orders = second.orders().await.unwrap();
        assert_eq!(orders.iter().map(|o| o.id).collect::<Vec<_>>(), vec![open.id]);
        assert_eq!(h.quantity(1), 112.0);
        assert_eq!(h.quantity(3), 100.0);
        assert_eq!(h.persisted().len(), 1);
    }

    #[actix::test]
    async fn test_restart_restores_open_orders() {
        let h = Harness::new();
        let first = h.start().await.unwrap();
        let a = first.create_order(draft(1, OperationMode::Out, 1.0, 1)).await.unwrap();
        let b = first.create_order(draft(2, OperationMode::In, 2.0, 2)).await.unwrap();
        first.shutdown().await.unwrap();

        let second = h.start().await.unwrap();

        assert_eq!(second.orders().await.unwrap(), vec![a, b]);
    }

    #[actix::test]
    async fn test_events_for_untracked_orders_are_ignored() {
        let h = Harness::new();
        let tracker = h.start().await.unwrap();
        let record = tracker.create_order(draft(1, OperationMode::Out, 1.0, 1)).await.unwrap();
        h.sim.seed_order(RemoteOrderSnapshot {
            id: OrderId(500),
            status: RemoteStatus::selected(),
            mode: OperationMode::Out,
            elevator: "Sim_1".to_string(),
            opening: 1,
            quantity: 9.0,
            ack_quantity: 0.0,
        });

        h.sim.complete(OrderId(500), 9.0);

        assert_eq!(tracker.orders().await.unwrap(), vec![record]);
        assert_eq!(h.quantity(1), 100.0);
    }

    #[actix::test]
    async fn test_remote_failure_leaves_state_unchanged() {
        let h = Harness::new();
        let tracker = h.start().await.unwrap();
        h.sim.fail_next(SimCommand::Enqueue, RemoteError::Rejected("queue full".to_string()));

        let err = tracker.create_order(draft(1, OperationMode::Out, 1.0, 1)).await.unwrap_err();

        assert!(matches!(err, TrackerError::RemoteCommand { command: "enqueue", .. }));
        assert!(tracker.orders().await.unwrap().is_empty());
        assert!(h.persisted().is_empty());
    }

    #[actix::test]
    async fn test_failed_connect_is_reported() {
        let h = Harness::new();
        h.sim.fail_next(SimCommand::Connect, RemoteError::Unreachable("127.0.0.1".to_string()));

        let err = h.start().await.err().unwrap();

        assert!(matches!(err, TrackerError::ConnectionFailure(RemoteError::Unreachable(_))));
    }

    #[actix::test]
    async fn test_failed_reconciliation_aborts_start() {
        let h = Harness::new();
        let first = h.start().await.unwrap();
        first.create_order(draft(1, OperationMode::Out, 1.0, 1)).await.unwrap();
        first.shutdown().await.unwrap();

        h.sim.fail_next(SimCommand::Query, RemoteError::Transport("reset".to_string()));
        let err = h.start().await.err().unwrap();

        assert!(matches!(err, TrackerError::RemoteCommand { command: "query_order", .. }));
        assert_eq!(h.sim.subscriber_count(), 0);
        assert!(!h.sim.is_connected());
        assert_eq!(h.persisted().len(), 1);
    }

    #[actix::test]
    async fn test_malformed_store_is_fatal_and_untouched() {
        let h = Harness::new();
        std::fs::write(&h.config.store_path, "{ not json").unwrap();

        let err = h.start().await.err().unwrap();

        assert!(matches!(err, TrackerError::Store(_)));
        assert_eq!(std::fs::read_to_string(&h.config.store_path).unwrap(), "{ not json");
        assert!(!h.sim.is_connected());
    }

    #[actix::test]
    async fn test_release_disconnects_when_actor_is_gone() {
        let h = Harness::new();
        let tracker = h.start().await.unwrap();
        tracker.shutdown().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Controller link reopened behind a stopped actor
        h.sim.connect("127.0.0.1").await.unwrap();
        tracker.release(h.sim.as_ref()).await;

        assert!(!h.sim.is_connected());
    }

    #[actix::test]
    async fn test_task_done_while_offline_is_applied_before_deletion() {
        let h = Harness::new();
        let first = h.start().await.unwrap();
        let record = first.create_order(draft(1, OperationMode::Out, 30.0, 1)).await.unwrap();
        first.shutdown().await.unwrap();

        let mut remote = h.sim.snapshot(record.id).unwrap();
        remote.status = RemoteStatus::task_done();
        remote.ack_quantity = 30.0;
        h.sim.seed_order(remote);

        let second = h.start().await.unwrap();
        assert_eq!(h.quantity(1), 70.0);
        assert!(second.order(record.id).await.unwrap().unwrap().status.is_task_done());

        h.sim.emit_queue_changed(QueueChanged {
            order_id: record.id,
            change_type: QueueChangeType::OrderDeleted,
        });

        assert!(second.orders().await.unwrap().is_empty());
        assert_eq!(h.quantity(1), 70.0);
    }

    #[actix::test]
    async fn test_archived_order_is_not_applied_twice() {
        let h = Harness::new();
        let first = h.start().await.unwrap();
        let record = first.create_order(draft(1, OperationMode::Out, 30.0, 1)).await.unwrap();
        h.sim.emit_status_changed(StatusChanged {
            order_id: record.id,
            status: RemoteStatus::task_done(),
            reported_quantity: 30.0,
        });
        assert!(first.order(record.id).await.unwrap().unwrap().status.is_task_done());
        assert_eq!(h.quantity(1), 70.0);
        first.shutdown().await.unwrap();

        h.sim.archive(record.id, 30.0);
        let second = h.start().await.unwrap();

        assert_eq!(h.quantity(1), 70.0);
        assert!(second.orders().await.unwrap().is_empty());
    }

    #[actix::test]
    async fn test_command_timeout() {
        let mut h = Harness::new();
        h.config = h.config.clone().with_command_timeout(Duration::from_secs(5));
        let tracker = h.start().await.unwrap();

        // The simulator answers immediately, well inside the limit
        assert!(tracker.create_order(draft(3, OperationMode::In, 2.0, 1)).await.is_ok());
    }

    #[actix::test]
    async fn test_shutdown_unsubscribes_and_stops() {
        let h = Harness::new();
        let tracker = h.start().await.unwrap();
        assert_eq!(h.sim.subscriber_count(), 2);

        tracker.shutdown().await.unwrap();

        assert_eq!(h.sim.subscriber_count(), 0);
        assert!(!h.sim.is_connected());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!tracker.is_running());
        assert!(tracker.orders().await.is_err());
    }
}
