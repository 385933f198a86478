//! Event types and the broadcast event bus
//!
//! Batch workers and request handlers emit events here; SSE endpoints
//! subscribe and forward them to UI clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Resale service event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResaleEvent {
    /// Batch classification job began processing
    BatchJobStarted {
        job_id: Uuid,
        stage: u8,
        total: usize,
        timestamp: DateTime<Utc>,
    },

    /// One more item of a batch job was processed
    BatchProgressUpdate {
        job_id: Uuid,
        stage: u8,
        processed: usize,
        total: usize,
        success_count: usize,
        failed_count: usize,
        avg_confidence: f64,
        timestamp: DateTime<Utc>,
    },

    /// Batch job reached a terminal status ("completed", "failed", "cancelled")
    BatchJobFinished {
        job_id: Uuid,
        stage: u8,
        status: String,
        processed: usize,
        success_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A manual category correction was stored
    PatternCorrected {
        signature: String,
        category_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl ResaleEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            ResaleEvent::BatchJobStarted { .. } => "BatchJobStarted",
            ResaleEvent::BatchProgressUpdate { .. } => "BatchProgressUpdate",
            ResaleEvent::BatchJobFinished { .. } => "BatchJobFinished",
            ResaleEvent::PatternCorrected { .. } => "PatternCorrected",
        }
    }
}

/// Broadcast bus for [`ResaleEvent`]s
///
/// Cloning is cheap; all clones share one channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ResaleEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ResaleEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ResaleEvent,
    ) -> Result<usize, broadcast::error::SendError<ResaleEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ResaleEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_emitted_event() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        let job_id = Uuid::new_v4();
        bus.emit(ResaleEvent::BatchJobStarted {
            job_id,
            stage: 1,
            total: 3,
            timestamp: Utc::now(),
        })
        .unwrap();

        match rx.recv().await.unwrap() {
            ResaleEvent::BatchJobStarted { job_id: got, total, .. } => {
                assert_eq!(got, job_id);
                assert_eq!(total, 3);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(10);
        let event = ResaleEvent::PatternCorrected {
            signature: "abc".to_string(),
            category_id: "293".to_string(),
            timestamp: Utc::now(),
        };
        assert!(bus.emit(event.clone()).is_err());
        // Lossy emit must not panic
        bus.emit_lossy(event);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.capacity(), 10);
    }

    #[test]
    fn test_serialized_tag_matches_event_type() {
        let event = ResaleEvent::BatchJobFinished {
            job_id: Uuid::new_v4(),
            stage: 2,
            status: "completed".to_string(),
            processed: 5,
            success_count: 4,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.event_type());
    }
}
