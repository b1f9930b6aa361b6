use std::sync::Arc;

use crate::domain::article::{ArticleId, ArticleInventory, ArticleRecord};
use crate::error::TrackerResult;
use crate::metrics::Metrics;
use crate::persistence::{OrderStore, StoreError};

use super::cache::OrderCache;
use super::errors::OrderError;
use super::value_objects::{OrderId, OrderRecord, RemoteStatus};

// ============================================================================
// Order Ledger - Cache + snapshot store + inventory, kept in lock-step
// ============================================================================
//
// Every public mutation writes the full snapshot before returning. A failed
// write is logged and counted; the in-memory change stands and the next
// successful write carries it.
//
// ============================================================================

pub struct OrderLedger {
    cache: OrderCache,
    store: OrderStore,
    inventory: Arc<dyn ArticleInventory>,
    metrics: Arc<Metrics>,
}

impl OrderLedger {
    /// Load the persisted snapshot into a fresh cache.
    pub fn open(
        store: OrderStore,
        inventory: Arc<dyn ArticleInventory>,
        metrics: Arc<Metrics>,
    ) -> TrackerResult<Self> {
        let records = store.load()?;
        let cache = OrderCache::from_records(records).map_err(|e| StoreError::Malformed {
            path: store.path().to_path_buf(),
            reason: e.to_string(),
        })?;

        tracing::info!(
            path = %store.path().display(),
            orders = cache.len(),
            "Order ledger opened"
        );
        metrics.tracked_orders.set(cache.len() as i64);

        Ok(Self {
            cache,
            store,
            inventory,
            metrics,
        })
    }

    pub fn records(&self) -> Vec<OrderRecord> {
        self.cache.all()
    }

    pub fn ids(&self) -> Vec<OrderId> {
        self.cache.ids()
    }

    pub fn get(&self, id: OrderId) -> Option<&OrderRecord> {
        self.cache.get(id)
    }

    pub fn contains(&self, id: OrderId) -> bool {
        self.cache.contains(id)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn articles(&self) -> Vec<ArticleRecord> {
        self.inventory.articles()
    }

    pub fn article(&self, id: ArticleId) -> Option<ArticleRecord> {
        self.inventory.get(id)
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn insert(&mut self, record: OrderRecord) -> Result<(), OrderError> {
        self.cache.insert(record)?;
        self.persist();
        Ok(())
    }

    pub fn remove(&mut self, id: OrderId) -> Option<OrderRecord> {
        let removed = self.cache.remove(id);
        if removed.is_some() {
            self.persist();
        }
        removed
    }

    pub fn update_status(&mut self, id: OrderId, status: RemoteStatus) -> Result<OrderRecord, OrderError> {
        let record = self.cache.update_status(id, status)?.clone();
        self.persist();
        Ok(record)
    }

    /// Mutate the cache without writing; the caller finishes with `persist`.
    pub(crate) fn cache_mut(&mut self) -> &mut OrderCache {
        &mut self.cache
    }

    /// Apply a completed order to its article's quantity.
    ///
    /// A missing article skips the adjustment; the order's own lifecycle
    /// continues regardless.
    pub fn apply_completion(&self, record: &OrderRecord, reported_quantity: f64) -> Option<f64> {
        match self
            .inventory
            .apply_adjustment(record.article_id, record.operation, reported_quantity)
        {
            Ok(quantity) => {
                self.metrics.record_adjustment(record.operation.as_str());
                tracing::info!(
                    order_id = %record.id,
                    article_id = %record.article_id,
                    mode = %record.operation,
                    reported = reported_quantity,
                    quantity,
                    "Applied order completion to inventory"
                );
                Some(quantity)
            }
            Err(e) => {
                tracing::warn!(
                    order_id = %record.id,
                    error = %e,
                    "Skipping inventory adjustment for completed order"
                );
                None
            }
        }
    }

    /// Write the full cache to the store.
    pub fn persist(&self) -> bool {
        let records = self.cache.all();
        match self.store.save(&records) {
            Ok(()) => {
                self.metrics.record_save(true, records.len());
                true
            }
            Err(e) => {
                self.metrics.record_save(false, records.len());
                tracing::error!(error = %e, orders = records.len(), "Failed to persist order snapshot");
                false
            }
        }
    }
}
