// tether_core/src/messages.rs

//! Wire messages and their JSON codec.
//!
//! These structs are the transport-facing schema. The in-process types
//! (`PhysicalState`, `Command`) convert to and from them here so that the
//! rest of the crate never sees serialization details.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::command::{BodyTarget, Command, TargetKind};
use crate::error::{BridgeError, BridgeResult};
use crate::orientation;
use crate::state::{EntityKind, PhysicalState, VehicleType};

// =========================================================================
// == Wire Primitives ==
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireVector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<&Vector3<f64>> for WireVector3 {
    fn from(v: &Vector3<f64>) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

impl From<WireVector3> for Vector3<f64> {
    fn from(v: WireVector3) -> Self {
        Vector3::new(v.x, v.y, v.z)
    }
}

impl WireVector3 {
    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WireQuaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl From<&UnitQuaternion<f64>> for WireQuaternion {
    fn from(q: &UnitQuaternion<f64>) -> Self {
        let [x, y, z, w] = orientation::to_xyzw(q);
        Self { x, y, z, w }
    }
}

/// Per-publication metadata.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Number of publications this bridge made before this one.
    pub seq: u64,
    /// Simulation time of the publishing tick, in seconds.
    pub stamp: f64,
}

// =========================================================================
// == State Message (outbound) ==
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMessage {
    pub header: Header,
    pub name: String,
    pub namespace: String,
    pub position: WireVector3,
    pub orientation: WireQuaternion,
    pub linear_force: WireVector3,
    pub torque: WireVector3,
    pub mass: f64,
    pub principal_inertia: WireVector3,
    pub children_names: Vec<String>,
    pub joint_names: Vec<String>,
    pub joint_positions: Vec<f32>,
    pub userdata: Vec<f32>,
    pub userdata_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wheel_count: Option<u32>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<VehicleType>,
}

impl StateMessage {
    pub fn from_state(state: &PhysicalState, header: Header) -> Self {
        let (wheel_count, vehicle_type) = match state.kind {
            EntityKind::RigidBody => (None, None),
            EntityKind::Vehicle {
                wheel_count,
                vehicle_type,
            } => (Some(wheel_count), Some(vehicle_type)),
        };

        Self {
            header,
            name: state.name().to_string(),
            namespace: state.namespace().to_string(),
            position: (&state.position).into(),
            orientation: state.orientation().into(),
            linear_force: (&state.force).into(),
            torque: (&state.torque).into(),
            mass: state.mass(),
            principal_inertia: state.principal_inertia().into(),
            children_names: state.children_names.clone(),
            joint_names: state.joint_names.clone(),
            joint_positions: state.joint_positions.clone(),
            userdata: state.userdata.clone(),
            userdata_description: state.userdata_description.clone(),
            wheel_count,
            vehicle_type,
        }
    }
}

pub fn encode_state(state: &PhysicalState, header: Header) -> BridgeResult<Vec<u8>> {
    serde_json::to_vec(&StateMessage::from_state(state, header))
        .map_err(|e| BridgeError::InvalidState(e.to_string()))
}

/// Used by observers of the state topic (monitors, tests).
pub fn decode_state(raw: &[u8]) -> BridgeResult<StateMessage> {
    serde_json::from_slice(raw).map_err(|e| BridgeError::Decode(e.to_string()))
}

// =========================================================================
// == Command Message (inbound) ==
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireBodyTarget {
    pub linear: WireVector3,
    pub angular: WireVector3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandMessage {
    pub target: TargetKind,
    #[serde(default)]
    pub values: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<WireBodyTarget>,
}

impl From<&Command> for CommandMessage {
    fn from(command: &Command) -> Self {
        Self {
            target: command.target,
            values: command.values.clone(),
            body: command.body.map(|b| WireBodyTarget {
                linear: (&b.linear).into(),
                angular: (&b.angular).into(),
            }),
        }
    }
}

impl TryFrom<CommandMessage> for Command {
    type Error = BridgeError;

    fn try_from(msg: CommandMessage) -> Result<Self, Self::Error> {
        if let Some(i) = msg.values.iter().position(|v| !v.is_finite()) {
            return Err(BridgeError::Decode(format!(
                "target value at index {} is not finite",
                i
            )));
        }
        let body = match msg.body {
            Some(b) if !(b.linear.is_finite() && b.angular.is_finite()) => {
                return Err(BridgeError::Decode(
                    "body target is not finite".to_string(),
                ));
            }
            Some(b) => Some(BodyTarget {
                linear: b.linear.into(),
                angular: b.angular.into(),
            }),
            None => None,
        };

        Ok(Command {
            target: msg.target,
            values: msg.values,
            body,
        })
    }
}

pub fn encode_command(command: &Command) -> BridgeResult<Vec<u8>> {
    serde_json::to_vec(&CommandMessage::from(command))
        .map_err(|e| BridgeError::InvalidState(e.to_string()))
}

pub fn decode_command(raw: &[u8]) -> BridgeResult<Command> {
    let msg: CommandMessage =
        serde_json::from_slice(raw).map_err(|e| BridgeError::Decode(e.to_string()))?;
    Command::try_from(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn header() -> Header {
        Header {
            seq: 3,
            stamp: 1.5,
        }
    }

    #[test]
    fn rigid_body_state_has_schema_fields_and_no_vehicle_fields() {
        let mut state = PhysicalState::new("box", "env", EntityKind::RigidBody);
        state.set_position(1.0, 2.0, 3.0);
        state.set_mass(4.0).unwrap();
        state.set_joint_names(vec!["hinge".into()]);
        state.set_joint_positions(vec![0.5]);

        let raw = encode_state(&state, header()).unwrap();
        let json: Value = serde_json::from_slice(&raw).unwrap();

        for key in [
            "header",
            "name",
            "namespace",
            "position",
            "orientation",
            "linear_force",
            "torque",
            "mass",
            "principal_inertia",
            "children_names",
            "joint_names",
            "joint_positions",
            "userdata",
            "userdata_description",
        ] {
            assert!(json.get(key).is_some(), "missing field {}", key);
        }
        assert!(json.get("wheel_count").is_none());
        assert!(json.get("type").is_none());
        assert_eq!(json["position"]["y"], 2.0);
        assert_eq!(json["orientation"]["w"], 1.0);
        assert_eq!(json["header"]["seq"], 3);
    }

    #[test]
    fn vehicle_state_carries_wheel_count_and_type() {
        let state = PhysicalState::new(
            "boat",
            "sea",
            EntityKind::Vehicle {
                wheel_count: 0,
                vehicle_type: VehicleType::Aquatic,
            },
        );
        let raw = encode_state(&state, header()).unwrap();
        let json: Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(json["wheel_count"], 0);
        assert_eq!(json["type"], "aquatic");

        let decoded = decode_state(&raw).unwrap();
        assert_eq!(decoded.vehicle_type, Some(VehicleType::Aquatic));
        assert_eq!(decoded.name, "boat");
    }

    #[test]
    fn decodes_minimal_command() {
        let cmd = decode_command(br#"{"target":"velocity","values":[0.1,0.2]}"#).unwrap();
        assert_eq!(cmd, Command::new(TargetKind::Velocity, vec![0.1, 0.2]));
    }

    #[test]
    fn decodes_body_target() {
        let raw = br#"{
            "target": "effort",
            "body": {
                "linear": {"x": 1.0, "y": 0.0, "z": 0.0},
                "angular": {"x": 0.0, "y": 0.0, "z": 2.0}
            }
        }"#;
        let cmd = decode_command(raw).unwrap();
        assert!(cmd.values.is_empty());
        let body = cmd.body.unwrap();
        assert_eq!(body.linear, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(body.angular, Vector3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn encoded_command_decodes_to_itself() {
        let cmd = Command::new(TargetKind::Position, vec![0.3])
            .with_body(Vector3::new(1.0, 2.0, 3.0), Vector3::zeros());
        let raw = encode_command(&cmd).unwrap();
        assert_eq!(decode_command(&raw).unwrap(), cmd);
    }

    #[test]
    fn rejects_malformed_commands() {
        let cases: [&[u8]; 6] = [
            b"",
            b"not json",
            br#"{"values":[1.0]}"#,
            br#"{"target":"torque","values":[]}"#,
            br#"{"target":"effort","values":["a"]}"#,
            br#"{"target":"effort","values":[],"stamp":12.0}"#,
        ];
        for raw in cases {
            let err = decode_command(raw).unwrap_err();
            assert!(
                matches!(err, BridgeError::Decode(_)),
                "expected decode error for {:?}",
                String::from_utf8_lossy(raw)
            );
        }
    }
}
