// ============================================================================
// Actors Module
// ============================================================================
//
// The tracker actor is the single writer of the order ledger. Commands from
// callers and events pushed by the controller both arrive in its mailbox.
//
// Note: Domain logic (orders, articles, reconciliation) lives in plain
//       structs; the actor only serializes access to them.
//
// ============================================================================

mod order_tracker;

pub use order_tracker::{
    AcknowledgeOrder, CreateOrder, GetArticle, GetArticles, GetOrder, GetOrders, OrderTrackerActor, Shutdown,
    Synchronize,
};
