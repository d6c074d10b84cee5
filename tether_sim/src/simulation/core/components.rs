// tether_sim/src/simulation/core/components.rs

use std::sync::Arc;

use bevy::prelude::Component;
use nalgebra::{UnitQuaternion, Vector3};
use tether_core::prelude::{Command, EntityBridge, EntityKind};

/// The rigid-body state the integrator owns. World frame, SI units.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct BodyState {
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
    pub linear_velocity: Vector3<f64>,
    pub angular_velocity: Vector3<f64>,
    /// Applied this tick; reset by the actuation stage.
    pub force: Vector3<f64>,
    pub torque: Vector3<f64>,
    pub mass: f64,
    pub principal_inertia: Vector3<f64>,
}

impl Default for BodyState {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            force: Vector3::zeros(),
            torque: Vector3::zeros(),
            mass: 1.0,
            principal_inertia: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

/// Named children and joints of an entity.
#[derive(Component, Debug, Clone, Default)]
pub struct EntityTopology {
    pub children: Vec<String>,
    pub joint_names: Vec<String>,
    pub joint_positions: Vec<f32>,
    pub joint_velocities: Vec<f64>,
    pub userdata_description: String,
}

#[derive(Component, Debug, Clone, Copy)]
pub struct EntityCategory(pub EntityKind);

/// The open bridge of an entity. Removing it closes the bridge.
#[derive(Component, Debug, Clone)]
pub struct BridgeLink(pub Arc<EntityBridge>);

/// A "mailbox" for the command of this tick, filled by the command stage and
/// read by the actuation stage.
#[derive(Component, Debug, Default)]
pub struct CommandInput {
    pub command: Option<Command>,
    pub received_at: Option<f64>,
    pub is_stale: bool,
}

impl CommandInput {
    /// The command, only while it is within its timeout.
    pub fn fresh(&self) -> Option<&Command> {
        if self.is_stale {
            None
        } else {
            self.command.as_ref()
        }
    }
}

/// Simulation time at which the entity leaves the scene.
#[derive(Component, Debug, Clone, Copy)]
pub struct DespawnAt(pub f64);
