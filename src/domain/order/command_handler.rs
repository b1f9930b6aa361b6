use crate::domain::article::ArticleRecord;

use super::commands::{AcknowledgeCommand, EnqueueCommand};
use super::errors::OrderError;
use super::ledger::OrderLedger;
use super::value_objects::{OrderDraft, OrderId, OrderRecord, RemoteStatus};

// ============================================================================
// Order Command Handler
// ============================================================================
//
// Splits each user command into a pure "prepare" step that validates local
// state and builds the remote command, and a "complete" step that applies
// the remote answer. The remote call itself happens in between, owned by
// the tracker actor.
//
//   prepare_create → enqueue (remote) → complete_create
//   prepare_acknowledge → acknowledge (remote)
//
// ============================================================================

/// A create-order call waiting for the controller to assign an id.
#[derive(Debug, Clone)]
pub struct PendingOrder {
    pub command: EnqueueCommand,
    pub draft: OrderDraft,
    pub article: ArticleRecord,
}

pub struct OrderCommandHandler {
    transaction_prefix: String,
    service_openings: u32,
    sequence: u64,
}

impl OrderCommandHandler {
    pub fn new(transaction_prefix: impl Into<String>, service_openings: u32) -> Self {
        Self {
            transaction_prefix: transaction_prefix.into(),
            service_openings,
            sequence: 0,
        }
    }

    /// Validate a draft and build the enqueue command for it.
    pub fn prepare_create(&mut self, ledger: &OrderLedger, draft: OrderDraft) -> Result<PendingOrder, OrderError> {
        let article = ledger
            .article(draft.article_id)
            .ok_or(OrderError::ArticleNotFound(draft.article_id))?;

        draft.validate(self.service_openings)?;

        self.sequence += 1;
        let command = EnqueueCommand {
            transaction_tag: format!("{}:{}", self.transaction_prefix, self.sequence),
            elevator: article.elevator.clone(),
            tray: article.tray_no,
            tray_coordinate: String::new(),
            opening: draft.service_opening,
            article_no: article.article_no.clone(),
            article_desc: article.article_desc.clone(),
            mode: draft.operation,
            no_return_of_tray: 0,
            priority: 1,
            quantity: draft.quantity,
            activate: true,
        };

        Ok(PendingOrder {
            command,
            draft,
            article,
        })
    }

    /// Record an order the controller accepted under `remote_id`.
    pub fn complete_create(
        &self,
        ledger: &mut OrderLedger,
        pending: PendingOrder,
        remote_id: OrderId,
    ) -> Result<OrderRecord, OrderError> {
        let record = OrderRecord {
            id: remote_id,
            remote_id,
            article_id: pending.article.id,
            article_no: pending.article.article_no,
            article_desc: pending.article.article_desc,
            elevator: pending.article.elevator,
            tray_no: pending.article.tray_no,
            quantity: pending.draft.quantity,
            service_opening: pending.draft.service_opening,
            operation: pending.draft.operation,
            status: RemoteStatus::selected(),
        };

        ledger.insert(record.clone())?;

        tracing::info!(
            order_id = %record.id,
            transaction_tag = %pending.command.transaction_tag,
            article_id = %record.article_id,
            mode = %record.operation,
            quantity = record.quantity,
            "Order created"
        );

        Ok(record)
    }

    /// Build the acknowledgement for a tracked order.
    pub fn prepare_acknowledge(
        &self,
        ledger: &OrderLedger,
        order_id: OrderId,
        quantity: f64,
    ) -> Result<AcknowledgeCommand, OrderError> {
        let order = ledger.get(order_id).ok_or(OrderError::OrderNotFound(order_id))?;

        if !quantity.is_finite() || quantity < 0.0 {
            return Err(OrderError::InvalidQuantity(quantity));
        }

        Ok(AcknowledgeCommand {
            elevator: order.elevator.clone(),
            opening: order.service_opening,
            quantity,
            use_panel_quantity: false,
        })
    }
}
