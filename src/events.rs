//! Events - Detection Event Distribution
//!
//! ## Responsibilities
//!
//! - Typed detection event payloads (fixed fields, built once)
//! - `EventSink` seam for external subscribers
//! - In-process broadcast hub implementation
//!
//! Delivery transports (WebSocket, webhooks) are out of scope; they sit
//! behind `EventSink` or subscribe to the hub.

use crate::models::DetectionResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Event published for every persisted detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub camera_id: String,
    /// Capture time, unix seconds
    pub timestamp: i64,
    pub faces_count: u32,
    pub image_ref: String,
    pub schedule_id: Option<String>,
}

impl From<&DetectionResult> for DetectionEvent {
    fn from(result: &DetectionResult) -> Self {
        Self {
            camera_id: result.camera_id.clone(),
            timestamp: result.timestamp,
            faces_count: result.faces_count,
            image_ref: result.image_ref.clone(),
            schedule_id: result.schedule_id.clone(),
        }
    }
}

/// Notification seam for external subscribers
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Publish one detection event
    async fn publish(&self, event: DetectionEvent);
}

/// In-process broadcast hub
pub struct EventHub {
    tx: broadcast::Sender<DetectionEvent>,
}

impl EventHub {
    /// Create a hub with the given subscriber channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future detection events
    pub fn subscribe(&self) -> broadcast::Receiver<DetectionEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EventSink for EventHub {
    async fn publish(&self, event: DetectionEvent) {
        tracing::info!(
            camera_id = %event.camera_id,
            faces_count = event.faces_count,
            schedule_id = ?event.schedule_id,
            "Detection event published"
        );

        // Send fails only when nobody is subscribed; that is fine
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_published_events() {
        let hub = EventHub::default();
        let mut rx = hub.subscribe();

        let result = DetectionResult::from_sweep("cam_1", 1_700_000_000, 2, None);
        hub.publish(DetectionEvent::from(&result)).await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.camera_id, "cam_1");
        assert_eq!(event.faces_count, 2);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_silent() {
        let hub = EventHub::default();
        let result = DetectionResult::from_sweep("cam_1", 1_700_000_000, 1, None);
        // Must not panic or error
        hub.publish(DetectionEvent::from(&result)).await;
    }
}
