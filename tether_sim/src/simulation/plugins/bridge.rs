// tether_sim/src/simulation/plugins/bridge.rs

//! Drives every entity's bridge from the fixed-step loop: pull commands,
//! apply them (or the fallback), push the integrated state.

use crate::prelude::*;
use nalgebra::Vector3;

pub struct BridgePlugin;

impl Plugin for BridgePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            OnEnter(AppState::SceneBuilding),
            attach_bridges.in_set(SceneBuildSet::AttachBridges),
        )
        .add_systems(FixedUpdate, read_commands.in_set(SimulationSet::Command))
        .add_systems(FixedUpdate, apply_commands.in_set(SimulationSet::Actuation))
        .add_systems(FixedUpdate, push_states.in_set(SimulationSet::StateSync))
        .add_observer(close_bridge_on_remove);
    }
}

// --- SPAWNING ---

fn attach_bridges(
    mut commands: Commands,
    network: Res<BridgeNetwork>,
    scenario: Res<ScenarioConfig>,
    query: Query<(Entity, &SpawnEntityRequest), With<BodyState>>,
) {
    for (entity, request) in &query {
        let config = request.0.bridge_config(&scenario.bridge);
        match EntityBridge::open(config, network.context()) {
            Ok(bridge) => {
                commands.entity(entity).insert(BridgeLink(bridge));
            }
            Err(e) => {
                error!("[SPAWN] Could not open bridge for '{}': {}", request.0.name, e);
                commands.entity(entity).despawn();
            }
        }
    }
}

/// The bridge lives exactly as long as its component.
fn close_bridge_on_remove(trigger: Trigger<OnRemove, BridgeLink>, links: Query<&BridgeLink>) {
    let Ok(link) = links.get(trigger.target()) else {
        return;
    };
    match link.0.close() {
        Ok(()) => debug!("Closed bridge {}", link.0.topics().state),
        Err(e) => warn!("Bridge {} was already closed: {}", link.0.topics().state, e),
    }
}

// --- RUNTIME ---

fn read_commands(clock: Res<SimClock>, mut query: Query<(&BridgeLink, &mut CommandInput)>) {
    let now = clock.now();
    for (link, mut input) in &mut query {
        match link.0.get_command(now) {
            Ok(sample) => {
                if !input.is_stale && sample.is_stale && input.command.is_some() {
                    warn!(
                        "{}: command went stale at t = {:.3} s, holding position",
                        link.0.topics().command,
                        now
                    );
                }
                input.received_at = sample.received_at();
                input.is_stale = sample.is_stale;
                input.command = sample.command().cloned();
            }
            Err(e) => {
                warn!("{}: {}", link.0.topics().command, e);
                *input = CommandInput {
                    is_stale: true,
                    ..default()
                };
            }
        }
    }
}

fn apply_commands(
    time: Res<Time<Fixed>>,
    mut query: Query<(&CommandInput, &mut BodyState, &mut EntityTopology)>,
) {
    let dt = time.delta_secs_f64();
    for (input, mut body, mut topology) in &mut query {
        match input.fresh() {
            Some(command) => apply_command(command, &mut body, &mut topology, dt),
            None => hold(&mut body, &mut topology),
        }
    }
}

/// Writes a fresh command into the body and its joints.
pub fn apply_command(command: &Command, body: &mut BodyState, topology: &mut EntityTopology, dt: f64) {
    body.force = Vector3::zeros();
    body.torque = Vector3::zeros();

    match command.target {
        TargetKind::Position => {
            if let Some(target) = command.body {
                body.position = target.linear;
                match tether_core::orientation::from_rpy(
                    target.angular.x,
                    target.angular.y,
                    target.angular.z,
                ) {
                    Ok(q) => body.orientation = q,
                    Err(e) => warn!("ignoring orientation target: {}", e),
                }
                body.linear_velocity = Vector3::zeros();
                body.angular_velocity = Vector3::zeros();
            }
            for (i, position) in topology.joint_positions.iter_mut().enumerate() {
                if let Some(target) = command.joint_target(i) {
                    *position = target as f32;
                }
            }
            topology.joint_velocities.iter_mut().for_each(|v| *v = 0.0);
        }
        TargetKind::Velocity => {
            if let Some(target) = command.body {
                body.linear_velocity = target.linear;
                body.angular_velocity = target.angular;
            }
            for (i, velocity) in topology.joint_velocities.iter_mut().enumerate() {
                if let Some(target) = command.joint_target(i) {
                    *velocity = target;
                }
            }
        }
        TargetKind::Effort => {
            if let Some(target) = command.body {
                body.force = target.linear;
                body.torque = target.angular;
            }
            // Joints are modelled with unit inertia.
            for (i, velocity) in topology.joint_velocities.iter_mut().enumerate() {
                if let Some(target) = command.joint_target(i) {
                    *velocity += target * dt;
                }
            }
        }
    }
}

/// Fallback without a fresh command: no wrench, no motion.
pub fn hold(body: &mut BodyState, topology: &mut EntityTopology) {
    body.force = Vector3::zeros();
    body.torque = Vector3::zeros();
    body.linear_velocity = Vector3::zeros();
    body.angular_velocity = Vector3::zeros();
    topology.joint_velocities.iter_mut().for_each(|v| *v = 0.0);
}

fn push_states(
    clock: Res<SimClock>,
    query: Query<(&BridgeLink, &BodyState, &EntityTopology, &EntityCategory)>,
) {
    let now = clock.now();
    for (link, body, topology, category) in &query {
        let config = link.0.config();
        let outcome = physical_state(&config.name, &config.namespace, category.0, body, topology)
            .and_then(|state| link.0.push_state(state, now));
        match outcome {
            Ok(PublishOutcome::Dropped) => {
                warn!("{}: outbox full, state deferred to the next tick", link.0.topics().state);
            }
            Ok(_) => {}
            Err(e) => warn!("{}: {}", link.0.topics().state, e),
        }
    }
}

/// Snapshot of one entity in the form the bridge publishes.
pub fn physical_state(
    name: &str,
    namespace: &str,
    kind: EntityKind,
    body: &BodyState,
    topology: &EntityTopology,
) -> BridgeResult<PhysicalState> {
    let mut state = PhysicalState::new(name, namespace, kind);
    state.position = body.position;
    state.set_orientation(body.orientation);
    state.force = body.force;
    state.torque = body.torque;
    state.set_mass(body.mass)?;
    let inertia = body.principal_inertia;
    state.set_principal_inertia(inertia.x, inertia.y, inertia.z)?;
    state.set_children_names(topology.children.clone());
    state.set_joint_names(topology.joint_names.clone());
    state.set_joint_positions(topology.joint_positions.clone());
    state.set_userdata_description(topology.userdata_description.clone());
    state.set_userdata(&[body.linear_velocity.norm() as f32]);
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn topology(joints: usize) -> EntityTopology {
        EntityTopology {
            joint_names: (0..joints).map(|i| format!("j{}", i)).collect(),
            joint_positions: vec![0.0; joints],
            joint_velocities: vec![0.0; joints],
            ..Default::default()
        }
    }

    #[test]
    fn effort_sets_wrench_and_accelerates_joints() {
        let mut body = BodyState::default();
        let mut topo = topology(2);
        let command = Command::new(TargetKind::Effort, vec![2.0])
            .with_body(Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 0.5));

        apply_command(&command, &mut body, &mut topo, 0.5);

        assert_eq!(body.force, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(body.torque, Vector3::new(0.0, 0.0, 0.5));
        // Only the joints the command addresses move.
        assert_eq!(topo.joint_velocities, vec![1.0, 0.0]);
    }

    #[test]
    fn position_teleports_and_stops() {
        let mut body = BodyState {
            linear_velocity: Vector3::new(3.0, 0.0, 0.0),
            ..Default::default()
        };
        let mut topo = topology(1);
        let command = Command::new(TargetKind::Position, vec![0.75]).with_body(
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2),
        );

        apply_command(&command, &mut body, &mut topo, 0.01);

        assert_eq!(body.position, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(body.linear_velocity, Vector3::zeros());
        assert_relative_eq!(
            body.orientation.euler_angles().2,
            std::f64::consts::FRAC_PI_2,
            epsilon = 1e-12
        );
        assert_eq!(topo.joint_positions, vec![0.75]);
    }

    #[test]
    fn hold_stops_everything() {
        let mut body = BodyState {
            linear_velocity: Vector3::new(1.0, 1.0, 0.0),
            force: Vector3::new(5.0, 0.0, 0.0),
            ..Default::default()
        };
        let mut topo = topology(1);
        topo.joint_velocities[0] = 2.0;

        hold(&mut body, &mut topo);

        assert_eq!(body.linear_velocity, Vector3::zeros());
        assert_eq!(body.force, Vector3::zeros());
        assert_eq!(topo.joint_velocities, vec![0.0]);
    }

    #[test]
    fn snapshot_carries_topology_and_kind() {
        let body = BodyState {
            position: Vector3::new(1.0, 0.0, 0.0),
            mass: 3.0,
            ..Default::default()
        };
        let mut topo = topology(2);
        topo.children = vec!["camera".into()];
        let kind = EntityKind::Vehicle {
            wheel_count: 4,
            vehicle_type: VehicleType::Ground,
        };

        let state = physical_state("rover", "fleet", kind, &body, &topo).unwrap();

        assert!(state.same_identity("rover", "fleet"));
        assert!(state.is_vehicle());
        assert_eq!(state.mass(), 3.0);
        assert_eq!(state.children_names, vec!["camera".to_string()]);
        assert_eq!(state.joint_names.len(), 2);
        assert!(state.joint_length_mismatch().is_none());
    }
}
