use crate::domain::article::ArticleId;
use super::value_objects::OrderId;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderError {
    #[error("Article not found: {0}")]
    ArticleNotFound(ArticleId),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Order already tracked: {0}")]
    DuplicateOrder(OrderId),

    #[error("Invalid order draft: {0}")]
    InvalidDraft(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(f64),
}
