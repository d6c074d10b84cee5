// tether_sim/src/simulation/plugins/bodies.rs

use crate::prelude::*;
use nalgebra::{UnitQuaternion, Vector3};

// --- THE PLUGIN ---
pub struct BodiesPlugin;

impl Plugin for BodiesPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            OnEnter(AppState::SceneBuilding),
            process_body_requests.in_set(SceneBuildSet::ProcessBodies),
        )
        .add_systems(
            FixedUpdate,
            (integrate_bodies, sync_bevy_transforms)
                .chain()
                .in_set(SimulationSet::Integration),
        );
    }
}

// --- SYSTEMS ---

/// SPAWNING: Reads the request and adds the physical and logical components.
fn process_body_requests(
    mut commands: Commands,
    request_query: Query<(Entity, &SpawnEntityRequest)>,
) {
    for (entity, request) in &request_query {
        let config = &request.0;
        let body = match body_from_config(config) {
            Ok(body) => body,
            Err(reason) => {
                error!("[SPAWN] Dropping '{}': {}", config.name, reason);
                commands.entity(entity).despawn();
                continue;
            }
        };

        let joint_positions: Vec<f32> = config.joints.iter().map(|j| j.position).collect();
        let topology = EntityTopology {
            children: config.children.clone(),
            joint_names: config.joint_names(),
            joint_velocities: vec![0.0; joint_positions.len()],
            joint_positions,
            userdata_description: config.userdata_description.clone(),
        };

        commands.entity(entity).insert((
            to_bevy_transform(&body),
            body,
            topology,
            EntityCategory(config.kind.into()),
            CommandInput::default(),
        ));
    }
}

fn body_from_config(config: &EntityConfig) -> std::result::Result<BodyState, String> {
    if !(config.mass.is_finite() && config.mass >= 0.0) {
        return Err(format!("mass must be finite and >= 0, got {}", config.mass));
    }
    if config
        .principal_inertia
        .iter()
        .any(|i| !(i.is_finite() && *i >= 0.0))
    {
        return Err(format!(
            "principal inertia must be finite and >= 0, got {:?}",
            config.principal_inertia
        ));
    }

    Ok(BodyState {
        position: config.starting_pose.translation,
        orientation: config.starting_pose.rotation,
        mass: config.mass,
        principal_inertia: config.principal_inertia,
        ..default()
    })
}

/// RUNTIME: Advances every body and its joints by one fixed step.
fn integrate_bodies(time: Res<Time<Fixed>>, mut query: Query<(&mut BodyState, &mut EntityTopology)>) {
    let dt = time.delta_secs_f64();
    if dt <= 0.0 {
        return;
    }
    for (mut body, mut topology) in &mut query {
        integrate(&mut body, dt);
        let topology = &mut *topology;
        for (position, velocity) in topology
            .joint_positions
            .iter_mut()
            .zip(&topology.joint_velocities)
        {
            *position += (*velocity * dt) as f32;
        }
    }
}

/// Semi-implicit Euler: velocities first, then the pose with the new
/// velocities. A zero mass or inertia component ignores the matching wrench.
pub fn integrate(body: &mut BodyState, dt: f64) {
    if body.mass > 0.0 {
        body.linear_velocity += body.force * (dt / body.mass);
    }
    let angular_acceleration = Vector3::from_fn(|i, _| {
        let inertia = body.principal_inertia[i];
        if inertia > 0.0 {
            body.torque[i] / inertia
        } else {
            0.0
        }
    });
    body.angular_velocity += angular_acceleration * dt;

    body.position += body.linear_velocity * dt;
    let rotation = UnitQuaternion::from_scaled_axis(body.angular_velocity * dt);
    body.orientation = rotation * body.orientation;
    // Keep drift from accumulating over long runs.
    body.orientation.renormalize_fast();
}

fn sync_bevy_transforms(mut query: Query<(&BodyState, &mut Transform)>) {
    for (body, mut transform) in &mut query {
        *transform = to_bevy_transform(body);
    }
}

fn to_bevy_transform(body: &BodyState) -> Transform {
    let t = body.position;
    let r = body.orientation.coords;
    Transform::from_xyz(t.x as f32, t.y as f32, t.z as f32).with_rotation(Quat::from_xyzw(
        r.x as f32, r.y as f32, r.z as f32, r.w as f32,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn force_accelerates_by_inverse_mass() {
        let mut body = BodyState {
            mass: 2.0,
            force: Vector3::new(4.0, 0.0, 0.0),
            ..Default::default()
        };
        integrate(&mut body, 0.5);
        // v = F/m * dt = 1.0, x = v * dt = 0.5
        assert_relative_eq!(body.linear_velocity.x, 1.0);
        assert_relative_eq!(body.position.x, 0.5);
    }

    #[test]
    fn massless_body_ignores_force() {
        let mut body = BodyState {
            mass: 0.0,
            force: Vector3::new(4.0, 0.0, 0.0),
            ..Default::default()
        };
        integrate(&mut body, 0.1);
        assert_eq!(body.linear_velocity, Vector3::zeros());
    }

    #[test]
    fn constant_yaw_rate_turns_the_body() {
        let mut body = BodyState {
            angular_velocity: Vector3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2),
            ..Default::default()
        };
        for _ in 0..100 {
            integrate(&mut body, 0.01);
        }
        let (_, _, yaw) = body.orientation.euler_angles();
        assert_relative_eq!(yaw, std::f64::consts::FRAC_PI_2, epsilon = 1e-9);
        assert_relative_eq!(body.orientation.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn rejects_negative_mass() {
        let config: EntityConfig = toml::from_str("name = \"box\"\nmass = -1.0").unwrap();
        assert!(body_from_config(&config).is_err());
    }
}
