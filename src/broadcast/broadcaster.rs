//! # Client Broadcaster
//!
//! Maintains the set of live client connections and fans orchestration
//! notifications out to all of them. The payload is serialized once per
//! broadcast; a delivery failure on one connection removes that connection
//! and is reported to the metrics store, but never aborts delivery to the
//! remaining connections.

use crate::broadcast::{BroadcastEvent, ClientSink};
use crate::config::BroadcastConfig;
use crate::metrics::{ConnectionEvent, MetricsStore};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;
use tracing::{debug, warn};

/// Fan-out channel to every live client connection
pub struct ClientBroadcaster {
    connections: RwLock<HashMap<Uuid, Arc<dyn ClientSink>>>,
    metrics: Arc<MetricsStore>,
    config: BroadcastConfig,
}

impl ClientBroadcaster {
    pub fn new(config: BroadcastConfig, metrics: Arc<MetricsStore>) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            metrics,
            config,
        }
    }

    /// Add a live connection and return its handle
    pub async fn register(&self, sink: Arc<dyn ClientSink>) -> Uuid {
        let id = Uuid::new_v4();
        self.connections.write().await.insert(id, sink);
        self.metrics.record_connection_event(ConnectionEvent::Connected);

        debug!(connection_id = %id, "Client connection registered");
        id
    }

    /// Remove a connection (client closed, transport error)
    pub async fn unregister(&self, id: Uuid, code: Option<u16>, reason: &str) {
        if self.connections.write().await.remove(&id).is_some() {
            self.metrics
                .record_connection_event(ConnectionEvent::Disconnected {
                    code,
                    reason: reason.to_string(),
                });
            debug!(connection_id = %id, reason = reason, "Client connection removed");
        }
    }

    /// Number of live connections
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Deliver an event to every live connection. Returns the number of
    /// successful deliveries. Connections whose send fails or times out are
    /// removed from the set.
    pub async fn broadcast(&self, event: &BroadcastEvent) -> usize {
        let frame = match serde_json::to_string(event) {
            Ok(frame) => frame,
            Err(e) => {
                // Events are plain data; a serialization failure is a bug,
                // but it must not take the orchestration loops down
                warn!(error = %e, "Failed to serialize broadcast event");
                return 0;
            }
        };

        let targets: Vec<(Uuid, Arc<dyn ClientSink>)> = {
            let connections = self.connections.read().await;
            connections
                .iter()
                .map(|(id, sink)| (*id, Arc::clone(sink)))
                .collect()
        };

        if targets.is_empty() {
            return 0;
        }

        let send_timeout = self.config.send_timeout();
        let sends = targets.iter().map(|(id, sink)| {
            let frame = frame.as_str();
            async move {
                match tokio::time::timeout(send_timeout, sink.send(frame)).await {
                    Ok(Ok(())) => (*id, None),
                    Ok(Err(e)) => (*id, Some(e.to_string())),
                    Err(_) => (*id, Some("send timed out".to_string())),
                }
            }
        });

        let outcomes = join_all(sends).await;

        let mut delivered = 0;
        let mut failed: Vec<(Uuid, String)> = Vec::new();
        for (id, failure) in outcomes {
            match failure {
                None => delivered += 1,
                Some(reason) => failed.push((id, reason)),
            }
        }

        for (id, reason) in &failed {
            warn!(
                connection_id = %id,
                reason = %reason,
                "Broadcast delivery failed; removing connection"
            );
            self.unregister(*id, None, reason).await;
        }

        debug!(
            delivered = delivered,
            failed = failed.len(),
            "Broadcast completed"
        );

        delivered
    }
}
