use futures_util::future::try_join_all;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::order::{OrderId, OrderLedger};
use crate::error::{TrackerError, TrackerResult};
use crate::remote::{with_timeout, RemoteOrderConnection, RemoteOrderSnapshot};

// ============================================================================
// Order Synchronizer - Startup reconciliation
// ============================================================================
//
// For every persisted order the controller is asked for its current view:
//
//   unknown     → drop locally (cannot be tracked any further)
//   Historical  → completed while we were away: adjust inventory, drop
//   TaskDone    → adjust inventory, keep until the queue deletes it
//   anything    → adopt the remote status
//
// An order's completion is applied once: on its first move into TaskDone,
// or on Historical when TaskDone was never seen locally.
//
// The fetch is async and touches nothing local; `apply` is the only step
// that mutates, and it finishes with a single snapshot write.
//
// ============================================================================

/// Remote answer per tracked order, `None` when the controller has no record.
pub type RemoteState = Vec<(OrderId, Option<RemoteOrderSnapshot>)>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub adopted: usize,
    pub completed: usize,
    pub dropped: usize,
}

#[derive(Clone)]
pub struct OrderSynchronizer {
    remote: Arc<dyn RemoteOrderConnection>,
    command_timeout: Option<Duration>,
}

impl OrderSynchronizer {
    pub fn new(remote: Arc<dyn RemoteOrderConnection>, command_timeout: Option<Duration>) -> Self {
        Self {
            remote,
            command_timeout,
        }
    }

    /// Query the controller for every id. Any failure aborts the whole pass.
    pub async fn fetch(&self, ids: Vec<OrderId>) -> TrackerResult<RemoteState> {
        let queries = ids.into_iter().map(|id| {
            let remote = self.remote.clone();
            let timeout = self.command_timeout;
            async move {
                let snapshot = with_timeout(timeout, remote.query_order(id))
                    .await
                    .map_err(|e| TrackerError::remote("query_order", e))?;
                Ok::<_, TrackerError>((id, snapshot))
            }
        });

        try_join_all(queries).await
    }

    /// Fold the remote answers into the ledger and persist once.
    pub fn apply(ledger: &mut OrderLedger, remote_state: RemoteState) -> SyncReport {
        let mut report = SyncReport::default();

        for (id, snapshot) in remote_state {
            let Some(record) = ledger.get(id).cloned() else {
                continue;
            };

            match snapshot {
                None => {
                    tracing::warn!(order_id = %id, "Controller has no record of tracked order, dropping it");
                    ledger.cache_mut().remove(id);
                    ledger.metrics().record_reconciled("dropped");
                    report.dropped += 1;
                }
                Some(remote) if remote.status.is_historical() => {
                    tracing::info!(
                        order_id = %id,
                        ack_quantity = remote.ack_quantity,
                        "Order completed while offline"
                    );
                    // A TaskDone record was already applied by the live event
                    if !record.status.is_task_done() {
                        ledger.apply_completion(&record, remote.ack_quantity);
                    }
                    ledger.cache_mut().remove(id);
                    ledger.metrics().record_reconciled("completed");
                    report.completed += 1;
                }
                Some(remote) => {
                    if remote.status != record.status {
                        tracing::debug!(
                            order_id = %id,
                            from = %record.status,
                            to = %remote.status,
                            "Adopting remote status"
                        );
                    }
                    if remote.status.is_task_done() && !record.status.is_task_done() {
                        tracing::info!(
                            order_id = %id,
                            ack_quantity = remote.ack_quantity,
                            "Order finished while offline"
                        );
                        ledger.apply_completion(&record, remote.ack_quantity);
                    }
                    // The id was just read from the cache
                    let _ = ledger.cache_mut().update_status(id, remote.status);
                    ledger.metrics().record_reconciled("adopted");
                    report.adopted += 1;
                }
            }
        }

        ledger.persist();
        report
    }
}
