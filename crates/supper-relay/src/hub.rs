//! # Event Hub
//!
//! Bounded fan-out from the relay loop to subscriber connections.
//!
//! Built on `tokio::sync::broadcast`: one bounded ring buffer shared by all
//! subscribers. A subscriber that falls behind by more than the hub
//! capacity drops its own oldest events (it observes a `Lagged` error and
//! continues); the producer and every other subscriber are unaffected.
//! Dropping a receiver releases exactly that subscriber's resources.

use tokio::sync::broadcast;
use tracing::debug;

use crate::envelope::EventEnvelope;

/// The shared fan-out hub.
#[derive(Debug, Clone)]
pub struct EventHub {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventHub {
    /// Creates a hub with the given per-subscriber buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        EventHub { tx }
    }

    /// Opens a new subscriber stream. The receiver sees every event
    /// published after this call, minus anything it lags past.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    /// Publishes an envelope to all current subscribers. An empty
    /// subscriber set is not an error.
    pub fn publish(&self, envelope: EventEnvelope) {
        match self.tx.send(envelope) {
            Ok(count) => debug!(subscribers = count, "Envelope fanned out"),
            Err(_) => debug!("No subscribers connected, envelope dropped"),
        }
    }

    /// Number of currently connected subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::normalize;

    #[tokio::test]
    async fn test_fanout_reaches_every_subscriber() {
        let hub = EventHub::new(16);
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();

        hub.publish(normalize("orders_events", r#"{"event":"order_created"}"#));

        assert_eq!(a.recv().await.unwrap().event, "order_created");
        assert_eq!(b.recv().await.unwrap().event, "order_created");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_fine() {
        let hub = EventHub::new(16);
        hub.publish(normalize("orders_events", "{}"));
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_drops_oldest_only_for_itself() {
        let hub = EventHub::new(2);
        let mut slow = hub.subscribe();

        for i in 0..5 {
            hub.publish(normalize("orders_events", &format!(r#"{{"event":"e{i}"}}"#)));
        }

        // The slow subscriber lost the oldest events...
        let err = slow.recv().await.unwrap_err();
        assert!(matches!(err, broadcast::error::RecvError::Lagged(_)));
        // ...but keeps receiving from the newest retained one.
        assert_eq!(slow.recv().await.unwrap().event, "e3");
        assert_eq!(slow.recv().await.unwrap().event, "e4");

        // A fresh subscriber only sees what comes after it joined.
        let mut fresh = hub.subscribe();
        hub.publish(normalize("orders_events", r#"{"event":"after"}"#));
        assert_eq!(fresh.recv().await.unwrap().event, "after");
    }

    #[tokio::test]
    async fn test_dropping_a_subscriber_releases_it() {
        let hub = EventHub::new(16);
        let a = hub.subscribe();
        let _b = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 2);
        drop(a);
        assert_eq!(hub.subscriber_count(), 1);
    }
}
