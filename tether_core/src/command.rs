// tether_core/src/command.rs

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// What the target values of a command mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Position,
    Velocity,
    Effort,
}

/// A body-level target, read according to the command's `TargetKind`:
///
/// | kind       | `linear`          | `angular`               |
/// |------------|-------------------|-------------------------|
/// | `Position` | position (m)      | roll/pitch/yaw (rad)    |
/// | `Velocity` | velocity (m/s)    | angular velocity (rad/s)|
/// | `Effort`   | force (N)         | torque (N·m)            |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyTarget {
    pub linear: Vector3<f64>,
    pub angular: Vector3<f64>,
}

/// The latest externally supplied targets for one entity.
///
/// `values` is indexed like the entity's `joint_names`. The receipt time is
/// not part of the command; the bridge records it next to the command.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub target: TargetKind,
    pub values: Vec<f64>,
    pub body: Option<BodyTarget>,
}

impl Command {
    pub fn new(target: TargetKind, values: Vec<f64>) -> Self {
        Self {
            target,
            values,
            body: None,
        }
    }

    pub fn with_body(mut self, linear: Vector3<f64>, angular: Vector3<f64>) -> Self {
        self.body = Some(BodyTarget { linear, angular });
        self
    }

    /// The target for joint `index`, if the command carries one.
    pub fn joint_target(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }
}
