// tether_core/src/buffers.rs

//! Latest-value slots shared between the simulation and transport contexts.
//!
//! Both buffers are a single atomic pointer: a write publishes a fully built
//! value in one swap, a read takes a reference-counted snapshot. Neither side
//! ever blocks the other and a reader can never observe half of a write.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::command::Command;
use crate::state::PhysicalState;

/// Holds the most recent state pushed by the simulation.
#[derive(Debug, Default)]
pub struct StateBuffer {
    slot: ArcSwapOption<PhysicalState>,
}

impl StateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored state and returns the one it replaced.
    pub fn set(&self, state: PhysicalState) -> Option<Arc<PhysicalState>> {
        self.slot.swap(Some(Arc::new(state)))
    }

    /// The latest state, or `None` if nothing was ever set.
    pub fn get(&self) -> Option<Arc<PhysicalState>> {
        self.slot.load_full()
    }
}

/// A command together with the time the bridge received it.
#[derive(Debug, Clone, PartialEq)]
pub struct StampedCommand {
    pub command: Command,
    /// Receipt time in seconds on the bridge clock. Never taken from the wire.
    pub received_at: f64,
}

/// Holds the most recent command delivered by the transport.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    slot: ArcSwapOption<StampedCommand>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces command and receipt time together.
    pub fn store(&self, command: Command, received_at: f64) {
        self.slot.store(Some(Arc::new(StampedCommand {
            command,
            received_at,
        })));
    }

    pub fn peek(&self) -> Option<Arc<StampedCommand>> {
        self.slot.load_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::TargetKind;
    use crate::state::EntityKind;
    use std::thread;

    #[test]
    fn state_buffer_starts_unset() {
        let buffer = StateBuffer::new();
        assert!(buffer.get().is_none());
    }

    #[test]
    fn state_buffer_keeps_only_latest() {
        let buffer = StateBuffer::new();
        let mut a = PhysicalState::new("box", "env", EntityKind::RigidBody);
        a.set_position(1.0, 0.0, 0.0);
        let mut b = a.clone();
        b.set_position(2.0, 0.0, 0.0);

        assert!(buffer.set(a.clone()).is_none());
        let previous = buffer.set(b.clone()).unwrap();
        assert_eq!(*previous, a);
        assert_eq!(*buffer.get().unwrap(), b);
    }

    #[test]
    fn command_buffer_stores_command_with_timestamp() {
        let buffer = CommandBuffer::new();
        assert!(buffer.peek().is_none());

        buffer.store(Command::new(TargetKind::Effort, vec![1.0]), 0.25);
        buffer.store(Command::new(TargetKind::Effort, vec![2.0]), 0.5);

        let stamped = buffer.peek().unwrap();
        assert_eq!(stamped.command.values, vec![2.0]);
        assert_eq!(stamped.received_at, 0.5);
    }

    // The writer keeps every field of a state equal to one counter value; a
    // torn read would show two different values inside one snapshot.
    #[test]
    fn concurrent_reader_never_sees_torn_state() {
        let buffer = Arc::new(StateBuffer::new());
        let writer_buffer = Arc::clone(&buffer);

        let writer = thread::spawn(move || {
            for i in 0..5_000 {
                let v = i as f64;
                let mut state = PhysicalState::new("box", "env", EntityKind::RigidBody);
                state.set_position(v, v, v);
                state.set_force(v, v, v);
                state.set_userdata(&[i as f32; 8]);
                writer_buffer.set(state);
            }
        });

        for _ in 0..5_000 {
            if let Some(state) = buffer.get() {
                let v = state.position.x;
                assert_eq!(state.position.y, v);
                assert_eq!(state.position.z, v);
                assert_eq!(state.force.x, v);
                assert!(state.userdata.iter().all(|u| *u as f64 == v));
            }
        }
        writer.join().unwrap();
    }
}
