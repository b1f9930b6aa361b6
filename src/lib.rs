//! Client-side order tracking for a vertical-lift warehouse controller.
//!
//! An [`OrderTracker`] keeps a persisted replica of the orders this client
//! enqueued, reconciles it against the controller at startup, applies the
//! controller's pushed status and queue events, and adjusts article
//! quantities when orders complete.

pub mod actors;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod metrics;
pub mod persistence;
pub mod remote;
pub mod sync;
mod tracker;

pub use config::{ConfigError, TrackerConfig};
pub use error::{TrackerError, TrackerResult};
pub use tracker::OrderTracker;
