// tether_sim/src/simulation/core/app_state.rs

use bevy::{ecs::schedule::SystemSet, prelude::States};

/// Defines the major phases of the application's lifecycle.
#[derive(States, Debug, Clone, Eq, PartialEq, Hash, Default)]
pub enum AppState {
    /// The initial state. Configuration and the prefab catalog are loaded here.
    #[default]
    AssetLoading,

    /// Configuration is resolved. We are now spawning entities and opening
    /// their bridges.
    SceneBuilding,

    /// The scene is built. The main simulation loop is now running.
    Running,
}

/// System sets to control the order of execution during the SceneBuilding state.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SceneBuildSet {
    /// Pass 1: Create entity shells and attach the spawn request component.
    CreateRequests,

    /// Pass 2: Attach the physical body, topology and category.
    ProcessBodies,

    /// Pass 3: Open one bridge per entity.
    AttachBridges,

    /// Pass 4: Remove all temporary request components.
    Cleanup,
}

// =========================================================================
// == Main Simulation Sets (The "Data Flow Graph") ==
// =========================================================================

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    /// Syncs the shared clock and feeds the control plane. Runs first.
    Precomputation,

    /// Pulls the latest command and its staleness out of every bridge.
    Command,

    /// Turns commands (or the fallback) into forces and velocities.
    Actuation,

    /// Advances every body by one tick.
    Integration,

    /// Pushes the new state of every body into its bridge.
    StateSync,

    /// Observes what went out on the transport.
    Monitoring,
}
