// tether_sim/src/simulation/core/events.rs
use bevy::prelude::Event;
use tether_core::messages::StateMessage;

/// A state publication seen on the transport by the state monitor.
#[derive(Event, Debug, Clone)]
pub struct StateObserved {
    pub topic: String,
    pub message: StateMessage,
}
