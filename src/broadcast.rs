//! Produce side of the graph update channel
//!
//! The engine only knows the [`GraphPublisher`] trait. [`BroadcastHub`] is an
//! in-process fan-out over `tokio::sync::broadcast`; a transport layer can
//! subscribe to it and forward updates to viewers. Sending never blocks and
//! does not need a runtime.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use crate::graph::{Graph, GraphLevel};

/// Updates pushed to subscribed viewers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum GraphUpdate {
    /// A graph was freshly built, not served from cache
    Built(Arc<Graph>),
    /// Cached graphs built from an entity were dropped
    Invalidated {
        level: Option<GraphLevel>,
        key: String,
        removed: usize,
    },
}

impl GraphUpdate {
    pub fn kind(&self) -> &'static str {
        match self {
            GraphUpdate::Built(_) => "built",
            GraphUpdate::Invalidated { .. } => "invalidated",
        }
    }
}

pub trait GraphPublisher: Send + Sync {
    fn publish(&self, update: GraphUpdate);
}

/// Default capacity; slow receivers past this lag and skip old updates
const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct BroadcastHub {
    tx: broadcast::Sender<GraphUpdate>,
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(CHANNEL_CAPACITY)
    }
}

impl BroadcastHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GraphUpdate> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl GraphPublisher for BroadcastHub {
    fn publish(&self, update: GraphUpdate) {
        let kind = update.kind();
        // No subscribers is not an error; the update is simply dropped
        match self.tx.send(update) {
            Ok(receivers) => trace!(kind, receivers, "graph update published"),
            Err(_) => trace!(kind, "graph update dropped, no subscribers"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribers_receive_updates() {
        let hub = BroadcastHub::default();
        let mut rx = hub.subscribe();

        hub.publish(GraphUpdate::Invalidated {
            level: None,
            key: "m1".to_string(),
            removed: 2,
        });

        match rx.try_recv().unwrap() {
            GraphUpdate::Invalidated { key, removed, .. } => {
                assert_eq!(key, "m1");
                assert_eq!(removed, 2);
            }
            other => panic!("unexpected update {other:?}"),
        }
    }

    #[test]
    fn test_publishing_without_subscribers_is_fine() {
        let hub = BroadcastHub::new(4);

        hub.publish(GraphUpdate::Invalidated {
            level: Some(GraphLevel::Module),
            key: "module:m1".to_string(),
            removed: 0,
        });

        assert_eq!(hub.receiver_count(), 0);
    }
}
