use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::order::OperationMode;
use super::value_objects::{ArticleId, ArticleRecord};

// ============================================================================
// Article Inventory - Per-article quantities
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InventoryError {
    #[error("Article not found: {0}")]
    ArticleNotFound(ArticleId),
}

/// Inventory collaborator. Quantities only change through `apply_adjustment`.
pub trait ArticleInventory: Send + Sync {
    /// Snapshot of all articles
    fn articles(&self) -> Vec<ArticleRecord>;

    fn get(&self, id: ArticleId) -> Option<ArticleRecord>;

    /// Apply a completed order's quantity; returns the new article quantity.
    fn apply_adjustment(
        &self,
        id: ArticleId,
        mode: OperationMode,
        quantity: f64,
    ) -> Result<f64, InventoryError>;
}

/// Inventory kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryInventory {
    articles: RwLock<HashMap<ArticleId, ArticleRecord>>,
}

impl InMemoryInventory {
    pub fn new(articles: impl IntoIterator<Item = ArticleRecord>) -> Self {
        Self {
            articles: RwLock::new(articles.into_iter().map(|a| (a.id, a)).collect()),
        }
    }

    // A panicking writer cannot leave a half-applied f64, so poisoning is ignored
    fn read(&self) -> RwLockReadGuard<'_, HashMap<ArticleId, ArticleRecord>> {
        self.articles.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ArticleId, ArticleRecord>> {
        self.articles.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl ArticleInventory for InMemoryInventory {
    fn articles(&self) -> Vec<ArticleRecord> {
        let mut articles: Vec<ArticleRecord> = self.read().values().cloned().collect();
        articles.sort_by_key(|a| a.id);
        articles
    }

    fn get(&self, id: ArticleId) -> Option<ArticleRecord> {
        self.read().get(&id).cloned()
    }

    fn apply_adjustment(
        &self,
        id: ArticleId,
        mode: OperationMode,
        quantity: f64,
    ) -> Result<f64, InventoryError> {
        let mut articles = self.write();
        let article = articles.get_mut(&id).ok_or(InventoryError::ArticleNotFound(id))?;

        let previous = article.quantity;
        article.quantity = mode.apply(previous, quantity);

        tracing::debug!(
            article_id = %id,
            mode = %mode,
            reported = quantity,
            previous,
            current = article.quantity,
            "Adjusted article quantity"
        );

        if article.quantity < 0.0 {
            tracing::warn!(
                article_id = %id,
                quantity = article.quantity,
                "Article quantity is negative after adjustment"
            );
        }

        Ok(article.quantity)
    }
}
