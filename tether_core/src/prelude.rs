// tether_core/src/prelude.rs

// --- Core Abstractions (the seams a host implements) ---
pub use crate::clock::{Clock, ManualClock, MonotonicClock};
pub use crate::transport::{InboundHandler, SubscriptionId, Transport};

// --- Core Data Structures ---
pub use crate::command::{BodyTarget, Command, TargetKind};
pub use crate::config::BridgeConfig;
pub use crate::error::{BridgeError, BridgeResult};
pub use crate::naming::TopicNames;
pub use crate::state::{EntityKind, PhysicalState, VehicleType};

// --- The Bridge ---
pub use crate::bridge::{
    BridgeContext, BridgeStats, CommandSample, EntityBridge, InboundOutcome, PublishOutcome,
};
pub use crate::buffers::{CommandBuffer, StampedCommand, StateBuffer};
pub use crate::throttle::{PublishDecision, PublishThrottle};
pub use crate::watchdog::CommandWatchdog;

// --- Concrete Transports ---
pub use crate::transport::{LoopbackTransport, Outbox, OutboxSender, OutboxStats};
