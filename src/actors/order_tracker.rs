use actix::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::config::TrackerConfig;
use crate::domain::article::{ArticleId, ArticleRecord};
use crate::domain::order::{
    OrderCommandHandler, OrderDraft, OrderId, OrderLedger, OrderRecord, QueueChanged, StatusChanged,
};
use crate::error::{TrackerError, TrackerResult};
use crate::remote::{with_timeout, RemoteOrderConnection, SubscriptionId};
use crate::sync::{EventReconciler, Notification, OrderSynchronizer, SyncReport};

// ============================================================================
// Actor Messages
// ============================================================================

#[derive(Message)]
#[rtype(result = "TrackerResult<OrderRecord>")]
pub struct CreateOrder {
    pub draft: OrderDraft,
}

#[derive(Message)]
#[rtype(result = "TrackerResult<()>")]
pub struct AcknowledgeOrder {
    pub order_id: OrderId,
    pub quantity: f64,
}

#[derive(Message)]
#[rtype(result = "Vec<OrderRecord>")]
pub struct GetOrders;

#[derive(Message)]
#[rtype(result = "Option<OrderRecord>")]
pub struct GetOrder {
    pub order_id: OrderId,
}

#[derive(Message)]
#[rtype(result = "Vec<ArticleRecord>")]
pub struct GetArticles;

#[derive(Message)]
#[rtype(result = "Option<ArticleRecord>")]
pub struct GetArticle {
    pub article_id: ArticleId,
}

/// Reconcile persisted orders against the controller, then go live.
#[derive(Message)]
#[rtype(result = "TrackerResult<SyncReport>")]
pub struct Synchronize;

/// Unsubscribe, disconnect and stop the actor.
#[derive(Message)]
#[rtype(result = "TrackerResult<()>")]
pub struct Shutdown;

// ============================================================================
// Order Tracker Actor - Single owner of the order ledger
// ============================================================================
//
// Commands and remote events all pass through this mailbox, so the cache,
// the snapshot file and article quantities only ever change one message at
// a time. Commands that await the controller use AtomicResponse: no other
// message is handled until the remote call and its local follow-up finish.
//
// Remote events arriving before startup reconciliation completes are held
// back and replayed, in arrival order, once the reconciled state is saved.
//
// ============================================================================

enum RemoteEvent {
    Status(StatusChanged),
    Queue(QueueChanged),
}

pub struct OrderTrackerActor {
    ledger: OrderLedger,
    commands: OrderCommandHandler,
    reconciler: EventReconciler,
    synchronizer: OrderSynchronizer,
    remote: Arc<dyn RemoteOrderConnection>,
    command_timeout: Option<Duration>,
    subscriptions: Vec<SubscriptionId>,
    live: bool,
    held_back: Vec<RemoteEvent>,
}

impl OrderTrackerActor {
    pub fn new(ledger: OrderLedger, remote: Arc<dyn RemoteOrderConnection>, config: &TrackerConfig) -> Self {
        Self {
            ledger,
            commands: OrderCommandHandler::new(config.transaction_prefix.clone(), config.service_openings),
            reconciler: EventReconciler::new(config.notification_capacity),
            synchronizer: OrderSynchronizer::new(remote.clone(), config.command_timeout),
            remote,
            command_timeout: config.command_timeout,
            subscriptions: Vec::new(),
            live: false,
            held_back: Vec::new(),
        }
    }

    pub fn notifications(&self) -> broadcast::Sender<Notification> {
        self.reconciler.sender()
    }

    fn dispatch(&mut self, event: RemoteEvent) {
        match event {
            RemoteEvent::Status(event) => {
                self.reconciler.on_status_changed(&mut self.ledger, event);
            }
            RemoteEvent::Queue(event) => {
                self.reconciler.on_queue_changed(&mut self.ledger, event);
            }
        }
    }

    fn go_live(&mut self) {
        self.live = true;
        let held_back = std::mem::take(&mut self.held_back);
        if !held_back.is_empty() {
            tracing::debug!(events = held_back.len(), "Replaying events received during reconciliation");
        }
        for event in held_back {
            self.dispatch(event);
        }
    }

    fn unsubscribe_all(&mut self) {
        for id in self.subscriptions.drain(..) {
            if !self.remote.unsubscribe(id) {
                tracing::debug!(subscription = %id, "Subscription was already inactive");
            }
        }
    }

    fn rejected<T: 'static>(&self, error: TrackerError) -> AtomicResponse<Self, TrackerResult<T>> {
        AtomicResponse::new(Box::pin(async move { Err::<T, _>(error) }.into_actor(self)))
    }
}

impl Actor for OrderTrackerActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let addr = ctx.address();
        self.subscriptions
            .push(self.remote.subscribe_status_changed(addr.clone().recipient()));
        self.subscriptions
            .push(self.remote.subscribe_queue_changed(addr.recipient()));

        tracing::info!(orders = self.ledger.len(), "🎯 OrderTrackerActor started");
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        self.unsubscribe_all();
        tracing::info!("🛑 OrderTrackerActor stopped");
    }
}

// ============================================================================
// Message Handlers
// ============================================================================

impl Handler<Synchronize> for OrderTrackerActor {
    type Result = AtomicResponse<Self, TrackerResult<SyncReport>>;

    fn handle(&mut self, _: Synchronize, _: &mut Self::Context) -> Self::Result {
        if self.live {
            tracing::debug!("Already synchronized, nothing to do");
            return AtomicResponse::new(Box::pin(
                async { Ok::<_, TrackerError>(SyncReport::default()) }.into_actor(self),
            ));
        }

        let ids = self.ledger.ids();
        let synchronizer = self.synchronizer.clone();
        tracing::info!(orders = ids.len(), "Reconciling persisted orders with controller");

        AtomicResponse::new(Box::pin(
            async move { synchronizer.fetch(ids).await }
                .into_actor(self)
                .map(|result, act: &mut Self, _| -> TrackerResult<SyncReport> {
                    let remote_state = match result {
                        Ok(state) => state,
                        Err(e) => {
                            if let TrackerError::RemoteCommand { command, .. } = &e {
                                act.ledger.metrics().record_remote_failure(command);
                            }
                            tracing::error!(error = %e, "Startup reconciliation failed");
                            return Err(e);
                        }
                    };

                    let report = OrderSynchronizer::apply(&mut act.ledger, remote_state);
                    tracing::info!(
                        adopted = report.adopted,
                        completed = report.completed,
                        dropped = report.dropped,
                        "✅ Reconciliation complete"
                    );

                    act.go_live();
                    Ok(report)
                }),
        ))
    }
}

impl Handler<CreateOrder> for OrderTrackerActor {
    type Result = AtomicResponse<Self, TrackerResult<OrderRecord>>;

    fn handle(&mut self, msg: CreateOrder, _: &mut Self::Context) -> Self::Result {
        let pending = match self.commands.prepare_create(&self.ledger, msg.draft) {
            Ok(pending) => pending,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected order draft");
                return self.rejected(e.into());
            }
        };

        let remote = self.remote.clone();
        let timeout = self.command_timeout;
        let command = pending.command.clone();

        AtomicResponse::new(Box::pin(
            async move { with_timeout(timeout, remote.enqueue(command)).await }
                .into_actor(self)
                .map(move |result, act: &mut Self, _| -> TrackerResult<OrderRecord> {
                    let remote_id = match result {
                        Ok(id) => id,
                        Err(e) => {
                            act.ledger.metrics().record_remote_failure("enqueue");
                            tracing::error!(
                                transaction_tag = %pending.command.transaction_tag,
                                error = %e,
                                "Controller did not accept order"
                            );
                            return Err(TrackerError::remote("enqueue", e));
                        }
                    };

                    let record = act.commands.complete_create(&mut act.ledger, pending, remote_id)?;
                    act.ledger.metrics().orders_created.inc();
                    Ok(record)
                }),
        ))
    }
}

impl Handler<AcknowledgeOrder> for OrderTrackerActor {
    type Result = AtomicResponse<Self, TrackerResult<()>>;

    fn handle(&mut self, msg: AcknowledgeOrder, _: &mut Self::Context) -> Self::Result {
        let command = match self.commands.prepare_acknowledge(&self.ledger, msg.order_id, msg.quantity) {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!(order_id = %msg.order_id, error = %e, "Rejected acknowledgement");
                return self.rejected(e.into());
            }
        };

        let remote = self.remote.clone();
        let timeout = self.command_timeout;
        let order_id = msg.order_id;
        let quantity = msg.quantity;

        AtomicResponse::new(Box::pin(
            async move { with_timeout(timeout, remote.acknowledge(command)).await }
                .into_actor(self)
                .map(move |result, act: &mut Self, _| -> TrackerResult<()> {
                    match result {
                        Ok(()) => {
                            act.ledger.metrics().orders_acknowledged.inc();
                            tracing::info!(order_id = %order_id, quantity, "Order acknowledged");
                            Ok(())
                        }
                        Err(e) => {
                            act.ledger.metrics().record_remote_failure("acknowledge");
                            tracing::error!(order_id = %order_id, error = %e, "Acknowledgement failed");
                            Err(TrackerError::remote("acknowledge", e))
                        }
                    }
                }),
        ))
    }
}

impl Handler<StatusChanged> for OrderTrackerActor {
    type Result = ();

    fn handle(&mut self, msg: StatusChanged, _: &mut Self::Context) {
        if self.live {
            self.dispatch(RemoteEvent::Status(msg));
        } else {
            self.held_back.push(RemoteEvent::Status(msg));
        }
    }
}

impl Handler<QueueChanged> for OrderTrackerActor {
    type Result = ();

    fn handle(&mut self, msg: QueueChanged, _: &mut Self::Context) {
        if self.live {
            self.dispatch(RemoteEvent::Queue(msg));
        } else {
            self.held_back.push(RemoteEvent::Queue(msg));
        }
    }
}

impl Handler<GetOrders> for OrderTrackerActor {
    type Result = MessageResult<GetOrders>;

    fn handle(&mut self, _: GetOrders, _: &mut Self::Context) -> Self::Result {
        MessageResult(self.ledger.records())
    }
}

impl Handler<GetOrder> for OrderTrackerActor {
    type Result = MessageResult<GetOrder>;

    fn handle(&mut self, msg: GetOrder, _: &mut Self::Context) -> Self::Result {
        MessageResult(self.ledger.get(msg.order_id).cloned())
    }
}

impl Handler<GetArticles> for OrderTrackerActor {
    type Result = MessageResult<GetArticles>;

    fn handle(&mut self, _: GetArticles, _: &mut Self::Context) -> Self::Result {
        MessageResult(self.ledger.articles())
    }
}

impl Handler<GetArticle> for OrderTrackerActor {
    type Result = MessageResult<GetArticle>;

    fn handle(&mut self, msg: GetArticle, _: &mut Self::Context) -> Self::Result {
        MessageResult(self.ledger.article(msg.article_id))
    }
}

impl Handler<Shutdown> for OrderTrackerActor {
    type Result = AtomicResponse<Self, TrackerResult<()>>;

    fn handle(&mut self, _: Shutdown, _: &mut Self::Context) -> Self::Result {
        tracing::info!("Received shutdown signal");

        // No further remote events once this returns
        self.unsubscribe_all();

        let remote = self.remote.clone();
        let timeout = self.command_timeout;

        AtomicResponse::new(Box::pin(
            async move { with_timeout(timeout, remote.disconnect()).await }
                .into_actor(self)
                .map(|result, _act: &mut Self, ctx: &mut Context<Self>| -> TrackerResult<()> {
                    ctx.stop();
                    result.map_err(|e| {
                        tracing::warn!(error = %e, "Disconnect failed during shutdown");
                        TrackerError::remote("disconnect", e)
                    })
                }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::article::ArticleInventory;
    use crate::domain::order::ledger::tests::{inventory_with, record, temp_store};
    use crate::domain::order::{OperationMode, QueueChangeType, RemoteStatus};
    use crate::metrics::Metrics;
    use crate::remote::{RemoteOrderSnapshot, SimulatedController};

    #[actix::test]
    async fn test_events_are_held_until_reconciled() {
        let (_dir, store) = temp_store();
        let inventory = inventory_with(100.0);
        let sim = Arc::new(SimulatedController::new());
        sim.connect("127.0.0.1").await.unwrap();
        sim.seed_order(RemoteOrderSnapshot {
            id: OrderId(1),
            status: RemoteStatus::selected(),
            mode: OperationMode::Out,
            elevator: "Sim_1".to_string(),
            opening: 1,
            quantity: 30.0,
            ack_quantity: 0.0,
        });

        let metrics = Arc::new(Metrics::new().unwrap());
        let mut ledger = OrderLedger::open(store.clone(), inventory.clone(), metrics).unwrap();
        ledger.insert(record(1, 1, OperationMode::Out)).unwrap();
        let addr = OrderTrackerActor::new(ledger, sim.clone(), &TrackerConfig::default()).start();

        addr.send(StatusChanged {
            order_id: OrderId(1),
            status: RemoteStatus::task_done(),
            reported_quantity: 30.0,
        })
        .await
        .unwrap();
        addr.send(QueueChanged {
            order_id: OrderId(1),
            change_type: QueueChangeType::OrderDeleted,
        })
        .await
        .unwrap();

        // Nothing applied before reconciliation
        assert_eq!(inventory.get(ArticleId(1)).unwrap().quantity, 100.0);
        assert_eq!(addr.send(GetOrders).await.unwrap().len(), 1);

        let report = addr.send(Synchronize).await.unwrap().unwrap();
        assert_eq!(report.adopted, 1);

        // Replayed in arrival order: completion first, then deletion
        assert_eq!(inventory.get(ArticleId(1)).unwrap().quantity, 70.0);
        assert!(addr.send(GetOrders).await.unwrap().is_empty());
        assert!(store.load().unwrap().is_empty());

        let again = addr.send(Synchronize).await.unwrap().unwrap();
        assert_eq!(again, SyncReport::default());
        assert_eq!(inventory.get(ArticleId(1)).unwrap().quantity, 70.0);
    }
}
