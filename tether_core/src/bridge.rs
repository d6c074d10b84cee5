// tether_core/src/bridge.rs

//! The per-entity session that ties buffers, throttle, watchdog and transport
//! together.
//!
//! Two contexts use a bridge at once: the simulation tick (`push_state`,
//! `get_command`) and the transport (`on_inbound_message`, plus the outbox
//! worker that performs the actual send). Every operation is non-blocking on
//! the simulation side.
//!
//! The live buffers sit in an atomically swappable slot. `close` empties the
//! slot; a call that already loaded it finishes on buffers it keeps alive, any
//! later call gets `BridgeError::BridgeClosed`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::buffers::{CommandBuffer, StampedCommand, StateBuffer};
use crate::clock::Clock;
use crate::command::Command;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::messages::{self, Header};
use crate::naming::TopicNames;
use crate::state::PhysicalState;
use crate::throttle::PublishThrottle;
use crate::transport::{InboundHandler, OutboxSender, SubscriptionId, Transport};
use crate::watchdog::CommandWatchdog;

// =========================================================================
// == Shared Context ==
// =========================================================================

/// Everything a bridge needs from its surroundings. Built once at startup and
/// passed by reference to every `EntityBridge::open`.
#[derive(Debug, Clone)]
pub struct BridgeContext {
    pub transport: Arc<dyn Transport>,
    pub outbox: OutboxSender,
    /// Stamps inbound commands. Must share its timebase with the `now` given to
    /// `get_command`.
    pub clock: Arc<dyn Clock>,
}

// =========================================================================
// == Results ==
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Encoded and queued for the transport, with the header sequence number.
    Published { seq: u64 },
    Suppressed,
    /// The throttle allowed it but the outbox could not take it.
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundOutcome {
    Stored,
    /// Malformed payload; the previous command is untouched.
    Dropped,
}

/// What the simulation gets back from `get_command`.
#[derive(Debug, Clone)]
pub struct CommandSample {
    pub latest: Option<Arc<StampedCommand>>,
    pub is_stale: bool,
}

impl CommandSample {
    pub fn command(&self) -> Option<&Command> {
        self.latest.as_deref().map(|s| &s.command)
    }

    pub fn received_at(&self) -> Option<f64> {
        self.latest.as_deref().map(|s| s.received_at)
    }

    /// The command, only if it is still within the timeout.
    pub fn fresh(&self) -> Option<&Command> {
        if self.is_stale {
            None
        } else {
            self.command()
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    published: AtomicU64,
    suppressed: AtomicU64,
    outbox_dropped: AtomicU64,
    commands_stored: AtomicU64,
    commands_rejected: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BridgeStats {
    pub published: u64,
    pub suppressed: u64,
    pub outbox_dropped: u64,
    pub commands_stored: u64,
    pub commands_rejected: u64,
}

// =========================================================================
// == Entity Bridge ==
// =========================================================================

/// Rate limiting and numbering of outbound states. Both only advance once a
/// message is actually queued.
struct Publisher {
    throttle: PublishThrottle,
    next_seq: u64,
}

/// Buffers and transport resources that live exactly as long as the bridge
/// is `Active`.
struct Session {
    state: StateBuffer,
    command: CommandBuffer,
    publisher: Mutex<Publisher>,
    outbox: OutboxSender,
    transport: Arc<dyn Transport>,
    /// Set right after the session is live, so nothing delivered in between
    /// finds the bridge closed.
    subscription: OnceLock<SubscriptionId>,
}

impl Session {
    fn unsubscribe(&self) {
        if let Some(id) = self.subscription.get() {
            self.transport.unsubscribe(*id);
        }
    }
}

pub struct EntityBridge {
    config: BridgeConfig,
    topics: TopicNames,
    state_topic: Arc<str>,
    watchdog: CommandWatchdog,
    session: ArcSwapOption<Session>,
    counters: Counters,
}

impl std::fmt::Debug for EntityBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityBridge")
            .field("topics", &self.topics)
            .field("closed", &self.is_closed())
            .field("stats", &self.stats())
            .finish()
    }
}

impl EntityBridge {
    /// Validates the config, resolves the topics and subscribes to the command
    /// topic. The bridge is `Active` when this returns.
    pub fn open(config: BridgeConfig, ctx: &BridgeContext) -> BridgeResult<Arc<Self>> {
        let topics = config.validate()?;

        let bridge = Arc::new(Self {
            watchdog: CommandWatchdog::new(config.timeout),
            state_topic: Arc::from(topics.state.as_str()),
            topics,
            config,
            session: ArcSwapOption::empty(),
            counters: Counters::default(),
        });

        let throttle = PublishThrottle::new(bridge.config.min_frequency, bridge.config.max_frequency);
        let session = Arc::new(Session {
            state: StateBuffer::new(),
            command: CommandBuffer::new(),
            publisher: Mutex::new(Publisher {
                throttle,
                next_seq: 0,
            }),
            outbox: ctx.outbox.clone(),
            transport: Arc::clone(&ctx.transport),
            subscription: OnceLock::new(),
        });
        bridge.session.store(Some(Arc::clone(&session)));

        // On failure the bridge is dropped here and the session with it.
        let handler = Self::inbound_handler(Arc::downgrade(&bridge), Arc::clone(&ctx.clock));
        let subscription = ctx.transport.subscribe(&bridge.topics.command, handler)?;
        session.subscription.get_or_init(|| subscription);

        info!(
            "Bridge open: state -> {}, command <- {} ({}..{} Hz, timeout {} s)",
            bridge.topics.state,
            bridge.topics.command,
            bridge.config.min_frequency,
            bridge.config.max_frequency,
            bridge.config.timeout
        );
        Ok(bridge)
    }

    /// The transport-side callback. Holds only a weak reference so the
    /// subscription never keeps a removed entity alive.
    fn inbound_handler(bridge: Weak<Self>, clock: Arc<dyn Clock>) -> InboundHandler {
        Arc::new(move |raw: &[u8]| {
            let Some(bridge) = bridge.upgrade() else {
                return;
            };
            if let Err(e) = bridge.on_inbound_message(raw, clock.now()) {
                debug!("ignoring command for {}: {}", bridge.topics.command, e);
            }
        })
    }

    fn session(&self) -> BridgeResult<Arc<Session>> {
        self.session.load_full().ok_or(BridgeError::BridgeClosed)
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn topics(&self) -> &TopicNames {
        &self.topics
    }

    pub fn is_closed(&self) -> bool {
        self.session.load().is_none()
    }

    pub fn stats(&self) -> BridgeStats {
        let c = &self.counters;
        BridgeStats {
            published: c.published.load(Ordering::Relaxed),
            suppressed: c.suppressed.load(Ordering::Relaxed),
            outbox_dropped: c.outbox_dropped.load(Ordering::Relaxed),
            commands_stored: c.commands_stored.load(Ordering::Relaxed),
            commands_rejected: c.commands_rejected.load(Ordering::Relaxed),
        }
    }

    /// The last state pushed, `None` before the first push.
    pub fn latest_state(&self) -> BridgeResult<Option<Arc<PhysicalState>>> {
        Ok(self.session()?.state.get())
    }

    /// Stores the state of this tick and, when the throttle allows it, queues
    /// its publication. Never blocks on the transport.
    pub fn push_state(&self, state: PhysicalState, now: f64) -> BridgeResult<PublishOutcome> {
        let session = self.session()?;

        if !state.same_identity(&self.config.name, &self.config.namespace) {
            return Err(BridgeError::IdentityMismatch {
                expected: format!("{}/{}", self.config.namespace, self.config.name),
                got: format!("{}/{}", state.namespace(), state.name()),
            });
        }
        if let Some((names, positions)) = state.joint_length_mismatch() {
            warn!(
                "{}: {} joint names but {} joint positions",
                self.topics.state, names, positions
            );
        }

        let changed = session.state.get().map_or(true, |prev| *prev != state);
        session.state.set(state);

        // Decide, enqueue and commit under one lock. A message the outbox
        // refuses leaves the throttle and the sequence untouched and the
        // change pending for the next tick.
        let mut publisher = session.publisher.lock();
        if changed {
            publisher.throttle.mark_changed();
        }
        let decision = publisher.throttle.decide(now);
        if !decision.should_publish() {
            self.counters.suppressed.fetch_add(1, Ordering::Relaxed);
            return Ok(PublishOutcome::Suppressed);
        }

        // Another writer may have pushed in between; latest wins.
        let Some(snapshot) = session.state.get() else {
            return Ok(PublishOutcome::Suppressed);
        };
        let seq = publisher.next_seq;
        let payload = messages::encode_state(&snapshot, Header { seq, stamp: now })?;

        if session.outbox.enqueue(Arc::clone(&self.state_topic), payload) {
            publisher.throttle.commit(now);
            publisher.next_seq += 1;
            self.counters.published.fetch_add(1, Ordering::Relaxed);
            trace!("{}: queued seq {} ({:?})", self.topics.state, seq, decision);
            Ok(PublishOutcome::Published { seq })
        } else {
            self.counters.outbox_dropped.fetch_add(1, Ordering::Relaxed);
            debug!("{}: outbox refused seq {}, retrying next tick", self.topics.state, seq);
            Ok(PublishOutcome::Dropped)
        }
    }

    /// The latest command and whether it is stale at `now`.
    pub fn get_command(&self, now: f64) -> BridgeResult<CommandSample> {
        let session = self.session()?;
        let latest = session.command.peek();
        let is_stale = self
            .watchdog
            .is_stale(now, latest.as_deref().map(|s| s.received_at));
        Ok(CommandSample { latest, is_stale })
    }

    /// Decodes an inbound payload and stores it stamped with `now`. A malformed
    /// payload is logged and dropped; only `BridgeClosed` is returned as an
    /// error.
    pub fn on_inbound_message(&self, raw: &[u8], now: f64) -> BridgeResult<InboundOutcome> {
        let session = self.session()?;
        match messages::decode_command(raw) {
            Ok(command) => {
                session.command.store(command, now);
                self.counters.commands_stored.fetch_add(1, Ordering::Relaxed);
                Ok(InboundOutcome::Stored)
            }
            Err(e) => {
                self.counters
                    .commands_rejected
                    .fetch_add(1, Ordering::Relaxed);
                warn!("{}: dropping malformed command: {}", self.topics.command, e);
                Ok(InboundOutcome::Dropped)
            }
        }
    }

    /// `Active -> Closed`. Cancels the subscription and releases the buffers.
    pub fn close(&self) -> BridgeResult<()> {
        let session = self.session.swap(None).ok_or(BridgeError::BridgeClosed)?;
        session.unsubscribe();
        info!("Bridge closed: {}", self.topics.state);
        Ok(())
    }
}

impl Drop for EntityBridge {
    fn drop(&mut self) {
        if let Some(session) = self.session.swap(None) {
            session.unsubscribe();
            debug!("Bridge dropped while active: {}", self.topics.state);
        }
    }
}
