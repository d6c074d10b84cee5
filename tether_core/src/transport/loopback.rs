// tether_core/src/transport/loopback.rs

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::trace;

use super::{InboundHandler, SubscriptionId, Transport};
use crate::error::{BridgeError, BridgeResult};

struct Subscriber {
    id: SubscriptionId,
    handler: InboundHandler,
}

/// In-process transport: `publish` calls the handlers of the topic directly
/// on the publishing thread.
///
/// Used by the simulation app to close the loop without a network, and by
/// tests. `set_connected(false)` makes every publish fail, emulating a lost
/// link.
pub struct LoopbackTransport {
    next_id: AtomicU64,
    connected: AtomicBool,
    delivered: AtomicU64,
    topics: RwLock<HashMap<String, Vec<Subscriber>>>,
}

impl std::fmt::Debug for LoopbackTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackTransport")
            .field("topics", &self.topics.read().len())
            .field("connected", &self.connected.load(Ordering::Relaxed))
            .field("delivered", &self.delivered.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            connected: AtomicBool::new(true),
            delivered: AtomicU64::new(0),
            topics: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    /// Total handler invocations so far.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.read().get(topic).map_or(0, Vec::len)
    }
}

impl Transport for LoopbackTransport {
    fn publish(&self, topic: &str, payload: &[u8]) -> BridgeResult<()> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(BridgeError::Transport(format!(
                "loopback disconnected, cannot publish on {}",
                topic
            )));
        }

        // Snapshot the handlers so no lock is held while they run.
        let handlers: Vec<InboundHandler> = match self.topics.read().get(topic) {
            Some(subs) => subs.iter().map(|s| s.handler.clone()).collect(),
            None => Vec::new(),
        };

        trace!("loopback: {} -> {} subscriber(s)", topic, handlers.len());
        for handler in handlers {
            handler(payload);
            self.delivered.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn subscribe(&self, topic: &str, handler: InboundHandler) -> BridgeResult<SubscriptionId> {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.topics
            .write()
            .entry(topic.to_string())
            .or_default()
            .push(Subscriber { id, handler });
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        let mut topics = self.topics.write();
        for subs in topics.values_mut() {
            subs.retain(|s| s.id != id);
        }
        topics.retain(|_, subs| !subs.is_empty());
    }
}
