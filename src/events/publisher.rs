use crate::events::OrchestrationEvent;
use tokio::sync::broadcast;

/// High-throughput publisher for orchestration lifecycle events
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<PublishedEvent>,
}

/// Event that has been published
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub event: OrchestrationEvent,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an orchestration event. Infallible: a broadcast `send` only
    /// errors when no subscribers exist, and publishing without listeners
    /// is acceptable here (tests, partial wiring).
    pub fn publish(&self, event: OrchestrationEvent) {
        let published = PublishedEvent {
            event,
            published_at: chrono::Utc::now(),
        };

        let _ = self.sender.send(published);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(1000) // Default capacity of 1000 events
    }
}
