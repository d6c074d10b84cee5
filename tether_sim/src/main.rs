// tether_sim/src/main.rs

//! Runs a Tether scenario headless.
//!
//! `cargo run -p tether_sim -- --scenario assets/scenarios/default.toml`

use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::state::app::StatesPlugin;
use clap::Parser;

use tether_sim::cli::Cli;
use tether_sim::simulation::config::{load_scenario, SystemPaths};
use tether_sim::TetherSimulationPlugin;

fn main() -> AppExit {
    let cli = Cli::parse();
    let paths = SystemPaths::from_env(cli.root.clone());

    // --- 1. Load Simulation Configuration ---
    let scenario_path = paths.resolve(&cli.scenario);
    let mut scenario = match load_scenario(&scenario_path) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("{}", e);
            return AppExit::error();
        }
    };
    if let Some(duration) = cli.duration {
        scenario.simulation.duration_seconds = duration;
    }
    let tick = Duration::from_secs_f64(1.0 / scenario.simulation.rate_hz.max(1.0));

    let mut app = App::new();

    // --- 2. Add Core Bevy Plugins & Resources ---
    app.add_plugins((
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(tick)),
        LogPlugin {
            level: bevy::log::Level::INFO,
            filter: "info,tether_sim=debug,tether_core=info".to_string(),
            ..default()
        },
        StatesPlugin,
    ))
    .insert_resource(scenario)
    .insert_resource(paths)
    .insert_resource(cli);

    // --- 3. Add the Main Tether Simulation Plugin ---
    app.add_plugins(TetherSimulationPlugin);

    // --- 4. Run the App ---
    app.run()
}
