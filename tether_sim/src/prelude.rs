// tether_sim/src/prelude.rs

// Re-export the entire Bevy prelude for convenience.
pub use bevy::prelude::*;

// Re-export the entire tether_core prelude so you can easily access
// pure types like `EntityBridge`, `PhysicalState`, `Command`, etc.
pub use tether_core::prelude::*;
// Bevy's prelude has a `Command` of its own; ours wins inside this crate.
pub use tether_core::prelude::Command;

// Re-export common simulation-specific types for easy access in other plugins.
pub use crate::simulation::config::structs::*;
pub use crate::simulation::core::app_state::{AppState, SceneBuildSet, SimulationSet};
pub use crate::simulation::core::components::{
    BodyState, BridgeLink, CommandInput, EntityCategory, EntityTopology,
};
pub use crate::simulation::core::events::StateObserved;
pub use crate::simulation::core::network::{BridgeNetwork, SimClock};
pub use crate::simulation::core::spawn_requests::SpawnEntityRequest;
