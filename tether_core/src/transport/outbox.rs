// tether_core/src/transport/outbox.rs

//! Hand-off queue between the simulation tick and the transport context.
//!
//! The simulation side only ever does a non-blocking `try_send`. A dedicated
//! worker thread drains the queue and performs the (possibly blocking)
//! `Transport::publish`. A full queue drops the newest message: the next tick
//! publishes a fresher state anyway.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::Transport;
use crate::error::{BridgeError, BridgeResult};

/// Bounded so a stalled transport cannot grow memory without limit.
pub const DEFAULT_OUTBOX_CAPACITY: usize = 1024;

/// How often the worker re-checks the running flag while idle.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug)]
struct OutboundMessage {
    topic: Arc<str>,
    payload: Vec<u8>,
}

#[derive(Debug, Default)]
struct Counters {
    sent: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
    in_flight: AtomicU64,
}

/// Point-in-time view of the outbox counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutboxStats {
    /// Handed to the transport successfully.
    pub sent: u64,
    /// Handed to the transport, which reported a failure. Not retried.
    pub failed: u64,
    /// Never queued because the queue was full or shut down.
    pub rejected: u64,
}

/// Cheap, cloneable producer side of the outbox. Held by every bridge.
#[derive(Debug, Clone)]
pub struct OutboxSender {
    sender: Sender<OutboundMessage>,
    /// Cleared by `stop` before the worker's final drain.
    accepting: Arc<RwLock<bool>>,
    counters: Arc<Counters>,
}

impl OutboxSender {
    /// Queues a message without blocking. Returns `false` if it was dropped.
    pub fn enqueue(&self, topic: Arc<str>, payload: Vec<u8>) -> bool {
        // Clones keep the channel connected after the worker is gone. The read
        // guard spans the send, so every accepted message precedes the drain.
        let accepting = self.accepting.read();
        if !*accepting {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            debug!("outbox shut down, dropping message for {}", topic);
            return false;
        }
        self.counters.in_flight.fetch_add(1, Ordering::AcqRel);
        match self.sender.try_send(OutboundMessage { topic, payload }) {
            Ok(()) => true,
            Err(TrySendError::Full(msg)) => {
                self.reject();
                debug!("outbox full, dropping message for {}", msg.topic);
                false
            }
            Err(TrySendError::Disconnected(msg)) => {
                self.reject();
                debug!("outbox shut down, dropping message for {}", msg.topic);
                false
            }
        }
    }

    fn reject(&self) {
        self.counters.in_flight.fetch_sub(1, Ordering::AcqRel);
        self.counters.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Messages queued or being published right now.
    pub fn pending(&self) -> u64 {
        self.counters.in_flight.load(Ordering::Acquire)
    }
}

/// Owner of the transport worker thread.
pub struct Outbox {
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
    accepting: Arc<RwLock<bool>>,
    sender: OutboxSender,
}

impl Outbox {
    /// Spawns the worker thread that publishes on `transport`.
    pub fn spawn(transport: Arc<dyn Transport>, capacity: usize) -> BridgeResult<Self> {
        let (sender, receiver) = channel::bounded(capacity.max(1));
        let running = Arc::new(AtomicBool::new(true));
        let counters = Arc::new(Counters::default());

        let running_clone = Arc::clone(&running);
        let counters_clone = Arc::clone(&counters);

        let handle = std::thread::Builder::new()
            .name("tether-outbox".to_string())
            .spawn(move || Self::run_loop(receiver, transport, running_clone, counters_clone))
            .map_err(|e| BridgeError::Transport(format!("failed to spawn outbox thread: {}", e)))?;

        info!("Outbox worker started (capacity {})", capacity.max(1));

        let accepting = Arc::new(RwLock::new(true));
        let sender = OutboxSender {
            sender,
            accepting: Arc::clone(&accepting),
            counters,
        };
        Ok(Self {
            handle: Some(handle),
            running,
            accepting,
            sender,
        })
    }

    pub fn sender(&self) -> OutboxSender {
        self.sender.clone()
    }

    pub fn stats(&self) -> OutboxStats {
        let c = &self.sender.counters;
        OutboxStats {
            sent: c.sent.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            rejected: c.rejected.load(Ordering::Relaxed),
        }
    }

    /// Blocks until every queued message was handed to the transport, or the
    /// timeout elapsed. Returns `true` when the queue drained.
    pub fn flush(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.sender.pending() > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }

    /// Stops the worker after it drains what is already queued.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        *self.accepting.write() = false;
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Outbox worker panicked during shutdown");
            }
        }
    }

    fn run_loop(
        receiver: Receiver<OutboundMessage>,
        transport: Arc<dyn Transport>,
        running: Arc<AtomicBool>,
        counters: Arc<Counters>,
    ) {
        loop {
            match receiver.recv_timeout(POLL_INTERVAL) {
                Ok(msg) => Self::deliver(&*transport, &counters, msg),
                Err(RecvTimeoutError::Timeout) => {
                    if !running.load(Ordering::Acquire) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        // Drain anything that raced with the shutdown flag.
        while let Ok(msg) = receiver.try_recv() {
            Self::deliver(&*transport, &counters, msg);
        }
        debug!("Outbox worker stopped");
    }

    fn deliver(transport: &dyn Transport, counters: &Counters, msg: OutboundMessage) {
        match transport.publish(&msg.topic, &msg.payload) {
            Ok(()) => {
                counters.sent.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!("publish on {} failed: {}", msg.topic, e);
            }
        }
        counters.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Drop for Outbox {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Outbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outbox")
            .field("running", &self.running.load(Ordering::Relaxed))
            .field("stats", &self.stats())
            .finish()
    }
}
