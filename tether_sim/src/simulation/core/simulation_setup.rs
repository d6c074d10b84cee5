// tether_sim/src/simulation/core/simulation_setup.rs

use std::time::Duration;

use crate::prelude::*;
use crate::simulation::config::ResolvedEntities;
use crate::simulation::core::components::DespawnAt;
use crate::simulation::core::network::{BridgeNetwork, SimClock};

pub struct SimulationSetupPlugin;

impl Plugin for SimulationSetupPlugin {
    fn build(&self, app: &mut App) {
        // This plugin's job is to read the config and add resources and startup systems.
        let rate_hz = app
            .world()
            .get_resource::<ScenarioConfig>()
            .map(|config| config.simulation.rate_hz)
            .filter(|rate| rate.is_finite() && *rate > 0.0)
            .unwrap_or_else(|| {
                warn!("No valid simulation rate configured, using 100 Hz.");
                100.0
            });

        app.insert_resource(Time::<Fixed>::from_duration(Duration::from_secs_f64(
            1.0 / rate_hz,
        )))
        // The clock every bridge stamps its inbound commands with.
        .init_resource::<SimClock>()
        .add_event::<StateObserved>();

        // --- CONFIGURE THE SPAWNING PIPELINE ---
        // This chain of SystemSets guarantees the correct spawning order.
        app.configure_sets(
            OnEnter(AppState::SceneBuilding),
            (
                SceneBuildSet::CreateRequests,
                SceneBuildSet::ProcessBodies,
                SceneBuildSet::AttachBridges,
                SceneBuildSet::Cleanup,
            )
                .chain(),
        );

        app.add_systems(OnEnter(AppState::AssetLoading), open_bridge_network)
            .add_systems(
                OnEnter(AppState::SceneBuilding),
                (
                    spawn_entity_shells.in_set(SceneBuildSet::CreateRequests),
                    cleanup_spawn_requests.in_set(SceneBuildSet::Cleanup),
                    transition_to_running
                        .in_set(SceneBuildSet::Cleanup)
                        .after(cleanup_spawn_requests),
                ),
            );

        // Configure the runtime schedule graph.
        app.configure_sets(
            FixedUpdate,
            (
                SimulationSet::Precomputation,
                SimulationSet::Command,
                SimulationSet::Actuation,
                SimulationSet::Integration,
                SimulationSet::StateSync,
                SimulationSet::Monitoring,
            )
                .chain()
                .distributive_run_if(in_state(AppState::Running)),
        );

        app.add_systems(
            FixedUpdate,
            (sync_sim_clock, despawn_expired_entities)
                .chain()
                .in_set(SimulationSet::Precomputation),
        );
    }
}

fn open_bridge_network(
    mut commands: Commands,
    clock: Res<SimClock>,
    scenario: Res<ScenarioConfig>,
) -> Result {
    let network = BridgeNetwork::open(&clock, scenario.simulation.outbox_capacity)?;
    info!("Bridge network open (loopback transport).");
    commands.insert_resource(network);
    Ok(())
}

fn spawn_entity_shells(mut commands: Commands, resolved_entities: Res<ResolvedEntities>) {
    for entity_config in &resolved_entities.0 {
        info!(
            "[SPAWN] Posting spawn request for resolved entity: {}",
            &entity_config.name
        );

        let mut shell = commands.spawn((
            Name::new(entity_config.name.clone()),
            SpawnEntityRequest(entity_config.clone()),
        ));
        if let Some(at) = entity_config.despawn_at {
            shell.insert(DespawnAt(at));
        }
    }
}

fn cleanup_spawn_requests(mut commands: Commands, query: Query<Entity, With<SpawnEntityRequest>>) {
    info!("[CLEANUP] Removing spawn request components.");
    for entity in &query {
        commands.entity(entity).remove::<SpawnEntityRequest>();
    }
}

/// Runs once at the end of the `OnEnter(SceneBuilding)` chain.
fn transition_to_running(mut next_state: ResMut<NextState<AppState>>) {
    info!("Scene building complete. Transitioning to Running state.");
    next_state.set(AppState::Running);
}

/// Simulation time is the fixed-step time. Every bridge reads it through the
/// shared clock.
pub fn sync_sim_clock(time: Res<Time<Fixed>>, clock: Res<SimClock>) {
    clock.0.set(time.elapsed_secs_f64());
}

fn despawn_expired_entities(
    mut commands: Commands,
    clock: Res<SimClock>,
    query: Query<(Entity, &Name, &DespawnAt)>,
) {
    let now = clock.now();
    for (entity, name, despawn_at) in &query {
        if now >= despawn_at.0 {
            info!("[DESPAWN] '{}' leaves the scene at t = {:.3} s", name, now);
            commands.entity(entity).despawn();
        }
    }
}
