// tether_core/src/transport/mod.rs

//! The publish/subscribe capability a bridge is given.
//!
//! The bridge never talks to a concrete middleware. It holds an
//! `Arc<dyn Transport>` and hands every outbound message to an [`Outbox`],
//! whose worker thread is the only caller of [`Transport::publish`].

mod loopback;
mod outbox;

use std::fmt::Debug;
use std::sync::Arc;

use crate::error::BridgeResult;

pub use loopback::LoopbackTransport;
pub use outbox::{Outbox, OutboxSender, OutboxStats, DEFAULT_OUTBOX_CAPACITY};

/// Callback invoked by the transport, on its own context, for every message
/// arriving on a subscribed topic.
pub type InboundHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

pub trait Transport: Debug + Send + Sync {
    /// Delivers `payload` to every current subscriber of `topic`. May block on
    /// I/O, which is why the bridge only calls it from the outbox thread.
    fn publish(&self, topic: &str, payload: &[u8]) -> BridgeResult<()>;

    fn subscribe(&self, topic: &str, handler: InboundHandler) -> BridgeResult<SubscriptionId>;

    /// Unknown or already removed ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}
