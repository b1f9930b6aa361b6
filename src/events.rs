use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Event Envelope - Metadata around republished notifications
// ============================================================================

/// Wraps a notification with identity, ordering and timing.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EventEnvelope<E> {
    pub event_id: Uuid,
    /// Monotonic per tracker, starting at 1
    pub sequence_number: u64,
    pub event_type: String,
    pub event_data: E,
    pub timestamp: DateTime<Utc>,
}

impl<E> EventEnvelope<E> {
    pub fn new(sequence_number: u64, event_type: impl Into<String>, event_data: E) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            sequence_number,
            event_type: event_type.into(),
            event_data,
            timestamp: Utc::now(),
        }
    }
}
