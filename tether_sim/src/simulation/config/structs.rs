// tether_sim/src/simulation/config/structs.rs

use bevy::prelude::Resource;
use figment::value::Value;
use nalgebra::{UnitQuaternion, Vector3};
use serde::Deserialize;
use tether_core::prelude::{BridgeConfig, Command, EntityKind, TargetKind, VehicleType};

use crate::simulation::utils::serde_helpers;

// =========================================================================
// == Top-Level Configuration Resource ==
// =========================================================================

/// # ScenarioConfig
/// The primary Bevy resource holding all configuration for a simulation run.
/// This struct is the root of the data parsed from a `scenario.toml` file.
#[derive(Resource, Debug, Deserialize, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub simulation: SimulationSection,

    /// Bridge options used by every entity that does not override them.
    #[serde(default)]
    pub bridge: BridgeDefaults,

    /// Raw entity tables. They may reference catalog prefabs with `from`, so
    /// they are only turned into `EntityConfig` after resolution.
    #[serde(default)]
    pub entities: Vec<Value>,
}

// =========================================================================
// == Configuration Sub-Structs ==
// =========================================================================

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct SimulationSection {
    /// Duration of the simulation in seconds.
    #[serde(default = "default_duration")]
    pub duration_seconds: f64,
    /// Fixed simulation tick rate in Hz.
    #[serde(default = "default_rate")]
    pub rate_hz: f64,
    /// Capacity of the outbound publication queue.
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            duration_seconds: default_duration(),
            rate_hz: default_rate(),
            outbox_capacity: default_outbox_capacity(),
        }
    }
}

fn default_duration() -> f64 {
    10.0
}
fn default_rate() -> f64 {
    100.0
}
fn default_outbox_capacity() -> usize {
    tether_core::transport::DEFAULT_OUTBOX_CAPACITY
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BridgeDefaults {
    #[serde(default = "default_min_frequency")]
    pub min_frequency: f64,
    #[serde(default = "default_max_frequency")]
    pub max_frequency: f64,
    #[serde(default = "default_timeout")]
    pub timeout: f64,
}

impl Default for BridgeDefaults {
    fn default() -> Self {
        Self {
            min_frequency: default_min_frequency(),
            max_frequency: default_max_frequency(),
            timeout: default_timeout(),
        }
    }
}

fn default_min_frequency() -> f64 {
    1.0
}
fn default_max_frequency() -> f64 {
    30.0
}
fn default_timeout() -> f64 {
    0.5
}

/// Per-entity overrides of `BridgeDefaults`.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BridgeOverrides {
    pub min_frequency: Option<f64>,
    pub max_frequency: Option<f64>,
    pub timeout: Option<f64>,
}

// =========================================================================
// == Entities ==
// =========================================================================

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct EntityConfig {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub bridge: BridgeOverrides,
    #[serde(default)]
    pub kind: KindConfig,
    #[serde(default = "default_mass")]
    pub mass: f64,
    #[serde(with = "serde_helpers::vec3_from_array", default = "default_inertia")]
    pub principal_inertia: Vector3<f64>,
    #[serde(default)]
    pub starting_pose: Pose,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub joints: Vec<JointConfig>,
    #[serde(default)]
    pub userdata_description: String,
    /// Commands the loopback control plane sends to this entity.
    #[serde(default)]
    pub script: Vec<ScriptedCommand>,
    /// Simulation time at which the entity is removed from the scene.
    #[serde(default)]
    pub despawn_at: Option<f64>,
}

fn default_mass() -> f64 {
    1.0
}

fn default_inertia() -> Vector3<f64> {
    Vector3::new(1.0, 1.0, 1.0)
}

impl EntityConfig {
    pub fn bridge_config(&self, defaults: &BridgeDefaults) -> BridgeConfig {
        BridgeConfig {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            min_frequency: self.bridge.min_frequency.unwrap_or(defaults.min_frequency),
            max_frequency: self.bridge.max_frequency.unwrap_or(defaults.max_frequency),
            timeout: self.bridge.timeout.unwrap_or(defaults.timeout),
        }
    }

    pub fn joint_names(&self) -> Vec<String> {
        self.joints.iter().map(|j| j.name.clone()).collect()
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(tag = "type")] // This tells serde to use the "type" field to decide which enum variant to parse
pub enum KindConfig {
    #[default]
    RigidBody,
    Vehicle {
        #[serde(default)]
        wheel_count: u32,
        #[serde(default)]
        vehicle_type: VehicleType,
    },
}

impl From<KindConfig> for EntityKind {
    fn from(kind: KindConfig) -> Self {
        match kind {
            KindConfig::RigidBody => EntityKind::RigidBody,
            KindConfig::Vehicle {
                wheel_count,
                vehicle_type,
            } => EntityKind::Vehicle {
                wheel_count,
                vehicle_type,
            },
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct JointConfig {
    pub name: String,
    /// Initial position (rad or m).
    #[serde(default)]
    pub position: f32,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScriptedCommand {
    /// Simulation time, in seconds, at which the command is sent.
    pub at: f64,
    pub target: TargetKind,
    #[serde(default)]
    pub values: Vec<f64>,
    #[serde(default)]
    pub body: Option<ScriptedBody>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScriptedBody {
    #[serde(with = "serde_helpers::vec3_from_array", default = "Vector3::zeros")]
    pub linear: Vector3<f64>,
    #[serde(with = "serde_helpers::vec3_from_array", default = "Vector3::zeros")]
    pub angular: Vector3<f64>,
}

impl ScriptedCommand {
    pub fn to_command(&self) -> Command {
        let command = Command::new(self.target, self.values.clone());
        match self.body {
            Some(body) => command.with_body(body.linear, body.angular),
            None => command,
        }
    }
}

// =========================================================================
// == Helper Structs for Nested Configuration ==
// =========================================================================

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct Pose {
    #[serde(with = "serde_helpers::vec3_from_array", default = "Vector3::zeros")]
    pub translation: Vector3<f64>,

    #[serde(
        with = "serde_helpers::quat_from_euler_deg",
        default = "UnitQuaternion::identity"
    )]
    pub rotation: UnitQuaternion<f64>,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
        }
    }
}
