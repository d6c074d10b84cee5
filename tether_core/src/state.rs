// tether_core/src/state.rs

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};
use crate::orientation;

// =========================================================================
// == Entity Category ==
// =========================================================================

/// The medium a vehicle moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    #[default]
    Ground,
    Aerial,
    Aquatic,
}

impl VehicleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Ground => "ground",
            VehicleType::Aerial => "aerial",
            VehicleType::Aquatic => "aquatic",
        }
    }
}

/// Category-specific payload carried next to the generic state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum EntityKind {
    #[default]
    RigidBody,
    Vehicle {
        wheel_count: u32,
        vehicle_type: VehicleType,
    },
}

// =========================================================================
// == Physical State ==
// =========================================================================

/// The full physical snapshot of one entity, as published on its state topic.
///
/// A state is built and mutated by the simulation side, then handed to the
/// bridge by value. The bridge never mutates it after that.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalState {
    name: String,
    namespace: String,
    pub kind: EntityKind,

    // --- Pose ---
    pub position: Vector3<f64>,
    orientation: UnitQuaternion<f64>,

    // --- Dynamics ---
    pub force: Vector3<f64>,
    pub torque: Vector3<f64>,
    mass: f64,
    principal_inertia: Vector3<f64>,

    // --- Topology ---
    pub children_names: Vec<String>,
    pub joint_names: Vec<String>,
    pub joint_positions: Vec<f32>,

    // --- Auxiliary ---
    pub userdata: Vec<f32>,
    pub userdata_description: String,
}

impl PhysicalState {
    /// A state at the origin with identity orientation, no mass and no topology.
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            kind,
            position: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            force: Vector3::zeros(),
            torque: Vector3::zeros(),
            mass: 0.0,
            principal_inertia: Vector3::zeros(),
            children_names: Vec::new(),
            joint_names: Vec::new(),
            joint_positions: Vec::new(),
            userdata: Vec::new(),
            userdata_description: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn orientation(&self) -> &UnitQuaternion<f64> {
        &self.orientation
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn principal_inertia(&self) -> &Vector3<f64> {
        &self.principal_inertia
    }

    pub fn set_position(&mut self, x: f64, y: f64, z: f64) {
        self.position = Vector3::new(x, y, z);
    }

    /// Sets the orientation from roll, pitch and yaw in radians.
    pub fn set_orientation_rpy(&mut self, roll: f64, pitch: f64, yaw: f64) -> BridgeResult<()> {
        self.orientation = orientation::from_rpy(roll, pitch, yaw)?;
        Ok(())
    }

    /// Sets the orientation from quaternion components; the input is normalized.
    pub fn set_orientation_xyzw(&mut self, x: f64, y: f64, z: f64, w: f64) -> BridgeResult<()> {
        self.orientation = orientation::from_xyzw(x, y, z, w)?;
        Ok(())
    }

    pub fn set_orientation(&mut self, q: UnitQuaternion<f64>) {
        self.orientation = q;
    }

    pub fn set_force(&mut self, fx: f64, fy: f64, fz: f64) {
        self.force = Vector3::new(fx, fy, fz);
    }

    pub fn set_torque(&mut self, nx: f64, ny: f64, nz: f64) {
        self.torque = Vector3::new(nx, ny, nz);
    }

    pub fn set_mass(&mut self, mass: f64) -> BridgeResult<()> {
        if !(mass.is_finite() && mass >= 0.0) {
            return Err(BridgeError::InvalidState(format!(
                "mass must be finite and >= 0, got {}",
                mass
            )));
        }
        self.mass = mass;
        Ok(())
    }

    pub fn set_principal_inertia(&mut self, ixx: f64, iyy: f64, izz: f64) -> BridgeResult<()> {
        let inertia = Vector3::new(ixx, iyy, izz);
        if inertia.iter().any(|i| !(i.is_finite() && *i >= 0.0)) {
            return Err(BridgeError::InvalidState(format!(
                "principal inertia must be finite and >= 0, got [{}, {}, {}]",
                ixx, iyy, izz
            )));
        }
        self.principal_inertia = inertia;
        Ok(())
    }

    /// Replaces the userdata with a single value.
    pub fn set_userdata_value(&mut self, value: f32) {
        self.userdata.clear();
        self.userdata.push(value);
    }

    pub fn set_userdata(&mut self, data: &[f32]) {
        self.userdata = data.to_vec();
    }

    pub fn set_userdata_description(&mut self, description: impl Into<String>) {
        self.userdata_description = description.into();
    }

    pub fn set_children_names(&mut self, names: Vec<String>) {
        self.children_names = names;
    }

    pub fn set_joint_names(&mut self, names: Vec<String>) {
        self.joint_names = names;
    }

    pub fn set_joint_positions(&mut self, positions: Vec<f32>) {
        self.joint_positions = positions;
    }

    /// `Some((names, positions))` when the two joint sequences disagree in length.
    /// Consumers treat this as a warning only.
    pub fn joint_length_mismatch(&self) -> Option<(usize, usize)> {
        let names = self.joint_names.len();
        let positions = self.joint_positions.len();
        (names != positions).then_some((names, positions))
    }

    pub fn is_vehicle(&self) -> bool {
        matches!(self.kind, EntityKind::Vehicle { .. })
    }

    pub fn set_wheel_count(&mut self, count: u32) {
        if let EntityKind::Vehicle { wheel_count, .. } = &mut self.kind {
            *wheel_count = count;
        }
    }

    pub fn set_vehicle_type(&mut self, kind: VehicleType) {
        if let EntityKind::Vehicle { vehicle_type, .. } = &mut self.kind {
            *vehicle_type = kind;
        }
    }

    pub fn same_identity(&self, name: &str, namespace: &str) -> bool {
        self.name == name && self.namespace == namespace
    }
}
