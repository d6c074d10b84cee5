// tether_sim/src/simulation/core/network.rs

use std::sync::Arc;

use bevy::prelude::Resource;
use tether_core::prelude::{
    BridgeContext, BridgeResult, Clock, ManualClock, MonotonicClock, OutboxStats, Transport,
};
use tether_core::transport::{LoopbackTransport, Outbox};

/// Simulation time shared with every bridge, so inbound commands are stamped
/// on the same timebase the staleness check uses.
#[derive(Resource, Debug, Clone)]
pub struct SimClock(pub Arc<ManualClock>);

impl Default for SimClock {
    fn default() -> Self {
        Self(Arc::new(ManualClock::new(0.0)))
    }
}

impl SimClock {
    pub fn now(&self) -> f64 {
        self.0.now()
    }
}

/// The in-process control plane: one loopback transport, the outbox worker
/// publishing on it, and the context every bridge is opened with.
#[derive(Resource, Debug)]
pub struct BridgeNetwork {
    pub transport: Arc<LoopbackTransport>,
    outbox: Outbox,
    context: BridgeContext,
    /// Wall time since the network opened, for the real-time factor.
    wall: MonotonicClock,
}

impl BridgeNetwork {
    pub fn open(clock: &SimClock, outbox_capacity: usize) -> BridgeResult<Self> {
        let transport = Arc::new(LoopbackTransport::new());
        let outbox = Outbox::spawn(transport.clone(), outbox_capacity)?;
        let context = BridgeContext {
            transport: transport.clone(),
            outbox: outbox.sender(),
            clock: clock.0.clone(),
        };
        Ok(Self {
            transport,
            outbox,
            context,
            wall: MonotonicClock::new(),
        })
    }

    pub fn context(&self) -> &BridgeContext {
        &self.context
    }

    pub fn outbox_stats(&self) -> OutboxStats {
        self.outbox.stats()
    }

    pub fn wall_elapsed(&self) -> f64 {
        self.wall.now()
    }

    /// Handler invocations on the loopback, commands and states alike.
    pub fn delivered(&self) -> u64 {
        self.transport.delivered()
    }

    pub fn flush(&self, timeout: std::time::Duration) -> bool {
        self.outbox.flush(timeout)
    }

    /// Sends straight on the transport, bypassing the outbox. Used by the
    /// scripted command source, which plays the remote side.
    pub fn send(&self, topic: &str, payload: &[u8]) -> BridgeResult<()> {
        self.transport.publish(topic, payload)
    }
}
