use std::collections::HashMap;

use super::errors::OrderError;
use super::value_objects::{OrderId, OrderRecord, RemoteStatus};

// ============================================================================
// Order Cache - In-memory index of tracked orders
// ============================================================================

/// Orders keyed by their controller-issued identifier.
///
/// The cache does not persist anything on its own; `OrderLedger` pairs each
/// mutation with a store write.
#[derive(Debug, Default, Clone)]
pub struct OrderCache {
    orders: HashMap<OrderId, OrderRecord>,
}

impl OrderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cache from persisted records, rejecting duplicate identifiers.
    pub fn from_records(records: Vec<OrderRecord>) -> Result<Self, OrderError> {
        let mut cache = Self::new();
        for record in records {
            cache.insert(record)?;
        }
        Ok(cache)
    }

    /// Snapshot of every tracked order, sorted by id.
    pub fn all(&self) -> Vec<OrderRecord> {
        let mut records: Vec<OrderRecord> = self.orders.values().cloned().collect();
        records.sort_by_key(|r| r.id);
        records
    }

    pub fn ids(&self) -> Vec<OrderId> {
        let mut ids: Vec<OrderId> = self.orders.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn get(&self, id: OrderId) -> Option<&OrderRecord> {
        self.orders.get(&id)
    }

    pub fn contains(&self, id: OrderId) -> bool {
        self.orders.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn insert(&mut self, record: OrderRecord) -> Result<(), OrderError> {
        if self.orders.contains_key(&record.id) {
            return Err(OrderError::DuplicateOrder(record.id));
        }
        self.orders.insert(record.id, record);
        Ok(())
    }

    /// Remove an order; absent ids are a no-op.
    pub fn remove(&mut self, id: OrderId) -> Option<OrderRecord> {
        self.orders.remove(&id)
    }

    pub fn update_status(&mut self, id: OrderId, status: RemoteStatus) -> Result<&OrderRecord, OrderError> {
        let record = self.orders.get_mut(&id).ok_or(OrderError::OrderNotFound(id))?;
        record.status = status;
        Ok(record)
    }
}
