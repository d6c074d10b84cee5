// tether_core/src/orientation.rs

//! Conversion between the two accepted orientation inputs and the canonical
//! unit quaternion stored in every `PhysicalState`.
//!
//! Roll/pitch/yaw follow the fixed-axis XYZ convention: the rotation is
//! `Rz(yaw) * Ry(pitch) * Rx(roll)`.

use nalgebra::{Quaternion, UnitQuaternion};

use crate::error::{BridgeError, BridgeResult};

/// Below this norm a quaternion carries no usable rotation.
pub const MIN_QUATERNION_NORM: f64 = 1e-9;

/// Builds the canonical orientation from roll, pitch and yaw (radians).
pub fn from_rpy(roll: f64, pitch: f64, yaw: f64) -> BridgeResult<UnitQuaternion<f64>> {
    if !(roll.is_finite() && pitch.is_finite() && yaw.is_finite()) {
        return Err(BridgeError::InvalidOrientation);
    }
    Ok(UnitQuaternion::from_euler_angles(roll, pitch, yaw))
}

/// Builds the canonical orientation from raw quaternion components,
/// normalizing them. Zero and non-finite inputs are rejected.
pub fn from_xyzw(x: f64, y: f64, z: f64, w: f64) -> BridgeResult<UnitQuaternion<f64>> {
    if !(x.is_finite() && y.is_finite() && z.is_finite() && w.is_finite()) {
        return Err(BridgeError::InvalidOrientation);
    }
    UnitQuaternion::try_new(Quaternion::new(w, x, y, z), MIN_QUATERNION_NORM)
        .ok_or(BridgeError::InvalidOrientation)
}

/// Returns `(roll, pitch, yaw)` in radians.
pub fn to_rpy(q: &UnitQuaternion<f64>) -> (f64, f64, f64) {
    q.euler_angles()
}

/// Returns the components in wire order `[x, y, z, w]`.
pub fn to_xyzw(q: &UnitQuaternion<f64>) -> [f64; 4] {
    let c = q.coords;
    [c.x, c.y, c.z, c.w]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector3;

    fn is_normalized(q: &UnitQuaternion<f64>) -> bool {
        (q.norm() - 1.0).abs() <= 1e-9
    }
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    const EPS: f64 = 1e-9;

    // q and -q are the same rotation.
    fn assert_same_rotation(q1: &UnitQuaternion<f64>, q2: &UnitQuaternion<f64>) {
        let dot = q1.coords.dot(&q2.coords);
        assert!(
            (dot.abs() - 1.0).abs() < EPS,
            "rotations differ: {:?} vs {:?}, dot: {}",
            q1.coords,
            q2.coords,
            dot
        );
    }

    #[test]
    fn rpy_matches_direct_axis_construction() {
        let (roll, pitch, yaw) = (0.3, -0.7, 1.9);
        let from_angles = from_rpy(roll, pitch, yaw).unwrap();

        let direct = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), yaw)
            * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), pitch)
            * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), roll);

        assert_same_rotation(&from_angles, &direct);
        assert!(is_normalized(&from_angles));
    }

    #[test]
    fn rpy_round_trips_away_from_gimbal_lock() {
        let q = from_rpy(0.1, 0.2, -2.5).unwrap();
        let (r, p, y) = to_rpy(&q);
        assert_abs_diff_eq!(r, 0.1, epsilon = EPS);
        assert_abs_diff_eq!(p, 0.2, epsilon = EPS);
        assert_abs_diff_eq!(y, -2.5, epsilon = EPS);
    }

    #[test]
    fn pure_yaw_quaternion_components() {
        let q = from_rpy(0.0, 0.0, FRAC_PI_2).unwrap();
        let [x, y, z, w] = to_xyzw(&q);
        assert_abs_diff_eq!(x, 0.0, epsilon = EPS);
        assert_abs_diff_eq!(y, 0.0, epsilon = EPS);
        assert_abs_diff_eq!(z, FRAC_PI_4.sin(), epsilon = EPS);
        assert_abs_diff_eq!(w, FRAC_PI_4.cos(), epsilon = EPS);
    }

    #[test]
    fn unnormalized_quaternion_is_normalized() {
        let q = from_xyzw(0.0, 0.0, 2.0, 2.0).unwrap();
        assert!(is_normalized(&q));
        let expected = from_rpy(0.0, 0.0, FRAC_PI_2).unwrap();
        assert_same_rotation(&q, &expected);
    }

    #[test]
    fn negated_quaternion_is_same_rotation() {
        let q = from_xyzw(0.1, 0.2, 0.3, 0.9).unwrap();
        let neg = from_xyzw(-0.1, -0.2, -0.3, -0.9).unwrap();
        assert_same_rotation(&q, &neg);
    }

    #[test]
    fn half_turn_roll() {
        let q = from_rpy(PI, 0.0, 0.0).unwrap();
        let direct = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PI);
        assert_same_rotation(&q, &direct);
    }

    #[test]
    fn rejects_degenerate_inputs() {
        assert_eq!(
            from_xyzw(0.0, 0.0, 0.0, 0.0),
            Err(BridgeError::InvalidOrientation)
        );
        assert_eq!(
            from_xyzw(f64::NAN, 0.0, 0.0, 1.0),
            Err(BridgeError::InvalidOrientation)
        );
        assert_eq!(
            from_rpy(0.0, f64::INFINITY, 0.0),
            Err(BridgeError::InvalidOrientation)
        );
    }
}
