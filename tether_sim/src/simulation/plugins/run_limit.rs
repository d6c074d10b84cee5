// tether_sim/src/simulation/plugins/run_limit.rs

use std::time::Duration;

use crate::prelude::*;
use crate::simulation::plugins::control_plane::{CommandScript, StateMonitor};

/// Ends the run once the scenario duration has elapsed.
pub struct RunLimitPlugin;

impl Plugin for RunLimitPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            stop_after_duration
                .in_set(SimulationSet::Monitoring)
                .after(crate::simulation::plugins::control_plane::MonitorSystems),
        );
    }
}

fn stop_after_duration(
    clock: Res<SimClock>,
    scenario: Res<ScenarioConfig>,
    network: Res<BridgeNetwork>,
    script: Res<CommandScript>,
    monitor: Res<StateMonitor>,
    links: Query<(&Name, &BridgeLink)>,
    mut exit: EventWriter<AppExit>,
    mut done: Local<bool>,
) {
    let now = clock.now();
    if *done || now < scenario.simulation.duration_seconds {
        return;
    }
    *done = true;

    if !network.flush(Duration::from_secs(1)) {
        warn!("Outbox did not drain before shutdown.");
    }

    let wall = network.wall_elapsed();
    info!(
        "==== Run summary at t = {:.3} s ({:.3} s wall, {:.1}x real time) ====",
        now,
        wall,
        if wall > 0.0 { now / wall } else { 0.0 }
    );
    for (name, link) in &links {
        let stats = link.0.stats();
        info!(
            "{} ({}): published {}, suppressed {}, outbox drops {}, commands {} stored / {} rejected",
            name,
            link.0.topics().state,
            stats.published,
            stats.suppressed,
            stats.outbox_dropped,
            stats.commands_stored,
            stats.commands_rejected
        );
    }
    let outbox = network.outbox_stats();
    info!(
        "outbox: sent {}, failed {}, rejected {}; loopback delivered {} message(s)",
        outbox.sent,
        outbox.failed,
        outbox.rejected,
        network.delivered()
    );
    info!(
        "control plane: {} scripted command(s) sent, {} pending; {} state message(s) observed on {} topic(s)",
        script.sent,
        script.remaining(),
        monitor.total_received(),
        monitor.watching()
    );

    exit.write(AppExit::Success);
}
