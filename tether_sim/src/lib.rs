// tether_sim/src/lib.rs

use bevy::prelude::*;

use crate::prelude::AppState;
use crate::simulation::config::ConfigPlugin;
use crate::simulation::core::simulation_setup::SimulationSetupPlugin;
use crate::simulation::plugins::bodies::BodiesPlugin;
use crate::simulation::plugins::bridge::BridgePlugin;
use crate::simulation::plugins::control_plane::ControlPlanePlugin;
use crate::simulation::plugins::run_limit::RunLimitPlugin;

// This prelude is for convenience for other files WITHIN the tether_sim crate.
pub mod prelude;

pub mod cli;
pub mod simulation;

/// The main plugin that brings together all the simulation parts.
/// `main.rs` adds it after the scenario and system paths are inserted as
/// resources, and after Bevy's `StatesPlugin`.
pub struct TetherSimulationPlugin;

impl Plugin for TetherSimulationPlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<AppState>();
        app.add_plugins((
            // Loads the catalog and resolves the scenario entities.
            ConfigPlugin,
            // Fixed timestep, shared clock, bridge network, schedule graph.
            SimulationSetupPlugin,
            // Spawns and integrates rigid bodies and vehicles.
            BodiesPlugin,
            // One bridge per entity: commands in, states out.
            BridgePlugin,
            // The in-process remote side: scripted commands and state monitor.
            ControlPlanePlugin,
            RunLimitPlugin,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::{BodyState, BridgeLink, BridgeNetwork, ScenarioConfig};
    use crate::simulation::config::SystemPaths;
    use crate::simulation::plugins::control_plane::StateMonitor;
    use bevy::state::app::StatesPlugin;
    use bevy::time::TimeUpdateStrategy;
    use std::path::PathBuf;
    use std::time::Duration;

    const SCENARIO: &str = r#"
        [simulation]
        duration_seconds = 100.0
        rate_hz = 100.0

        [bridge]
        min_frequency = 1.0
        max_frequency = 10.0
        timeout = 0.2

        [[entities]]
        name = "cart"
        namespace = "lab"
        mass = 2.0

        [[entities.script]]
        at = 0.0
        target = "velocity"
        body = { linear = [1.0, 0.0, 0.0] }

        [[entities]]
        name = "crate"
        namespace = "lab"
        despawn_at = 0.3
    "#;

    fn headless_app() -> App {
        app_with_scenario(toml::from_str(SCENARIO).unwrap())
    }

    fn app_with_scenario(scenario: ScenarioConfig) -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, StatesPlugin))
            .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(10)))
            .insert_resource(scenario)
            .insert_resource(SystemPaths::with_catalog_path(
                PathBuf::from("/nonexistent/tether"),
                None,
            ))
            .add_plugins(TetherSimulationPlugin);
        app
    }

    #[test]
    fn scripted_command_moves_body_until_it_goes_stale() {
        let mut app = headless_app();
        for _ in 0..150 {
            app.update();
        }
        assert_eq!(
            app.world().resource::<State<AppState>>().get(),
            &AppState::Running
        );

        let mut bodies = app.world_mut().query::<(&Name, &BodyState, &BridgeLink)>();
        let (_, cart, link) = bodies
            .iter(app.world())
            .find(|(name, _, _)| name.as_str() == "cart")
            .expect("cart was spawned");

        // One second of commanded motion would be 1 m; the 0.2 s timeout
        // stops it early and the fallback holds it.
        assert!(cart.position.x > 0.15 && cart.position.x < 0.25, "x = {}", cart.position.x);
        assert_eq!(cart.linear_velocity, nalgebra::Vector3::zeros());

        let stats = link.0.stats();
        assert_eq!(stats.commands_stored, 1);
        assert!(stats.published >= 2);
        assert!(stats.suppressed > 0);
    }

    #[test]
    fn despawned_entity_closes_its_bridge() {
        let mut app = headless_app();
        for _ in 0..60 {
            app.update();
        }

        let mut names = app.world_mut().query::<&Name>();
        assert!(names.iter(app.world()).all(|name| name.as_str() != "crate"));

        let network = app.world().resource::<BridgeNetwork>();
        assert_eq!(network.transport.subscriber_count("/lab/crate/Command"), 0);
        assert_eq!(network.transport.subscriber_count("/lab/cart/Command"), 1);
    }

    #[test]
    fn monitor_sees_published_states() {
        let mut app = headless_app();
        for _ in 0..50 {
            app.update();
        }
        assert!(app
            .world()
            .resource::<BridgeNetwork>()
            .flush(Duration::from_secs(2)));
        app.update();

        let monitor = app.world().resource::<StateMonitor>();
        assert!(monitor.received.get("/lab/cart/State").copied().unwrap_or(0) > 0);
        assert_eq!(monitor.malformed, 0);
        assert_eq!(monitor.watching(), 2);

        // One scripted command plus every state the monitor saw.
        let network = app.world().resource::<BridgeNetwork>();
        assert!(network.delivered() > monitor.total_received());
        assert!(network.wall_elapsed() > 0.0);
    }

    #[test]
    fn run_ends_after_scenario_duration() {
        let mut scenario: ScenarioConfig = toml::from_str(SCENARIO).unwrap();
        scenario.simulation.duration_seconds = 0.2;
        let mut app = app_with_scenario(scenario);

        // Exit events only live for two frames, so look after every update.
        let mut exit_after = None;
        for update in 0..60 {
            app.update();
            if let Some(exit) = app.should_exit() {
                exit_after = Some((update, exit));
                break;
            }
        }
        let (update, exit) = exit_after.expect("app asked to exit");
        assert_eq!(exit, AppExit::Success);
        // Three frames of state transitions, then 0.2 s at 100 Hz.
        assert!(update >= 15, "exited after {} updates", update);
    }
}
