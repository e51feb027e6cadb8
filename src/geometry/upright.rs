//! Tilt removal: turn an arbitrary pose into an upright one that keeps its
//! horizontal heading.

use nalgebra::{UnitQuaternion, Vector3};

use super::pose::{CANONICAL_FORWARD, Pose, WORLD_UP};

/// Below this squared length the horizontal part of the forward vector is
/// treated as degenerate (pose looks straight up or down).
pub const DEGENERATE_FORWARD_SQ: f64 = 1e-3;

/// Horizontal heading of `rotation`, or `CANONICAL_FORWARD` when the forward
/// axis is (nearly) vertical. Always unit length with zero Y.
pub fn horizontal_forward(rotation: &UnitQuaternion<f64>) -> Vector3<f64> {
    let mut forward = rotation * CANONICAL_FORWARD;
    forward.y = 0.0;

    if forward.norm_squared() < DEGENERATE_FORWARD_SQ {
        return CANONICAL_FORWARD;
    }
    forward.normalize()
}

/// Remove roll and pitch from `pose`.
///
/// The result keeps the position, has its up axis exactly on `WORLD_UP` and
/// faces along the horizontal projection of the original forward axis.
pub fn flatten(pose: &Pose) -> Pose {
    let forward = horizontal_forward(&pose.rotation);
    Pose {
        position: pose.position,
        rotation: upright_rotation(&forward),
    }
}

/// Upright rotation looking along a horizontal unit `forward`.
fn upright_rotation(forward: &Vector3<f64>) -> UnitQuaternion<f64> {
    // Heading angle about +Y measured from +Z toward +X.
    let yaw = forward.x.atan2(forward.z);
    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw)
}

/// True if `pose`'s up axis lies on `WORLD_UP` within `tolerance`.
pub fn is_upright(pose: &Pose, tolerance: f64) -> bool {
    (pose.up() - WORLD_UP).norm() <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::pose::marker_to_floorplan;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    fn random_rotation(rng: &mut StdRng) -> UnitQuaternion<f64> {
        UnitQuaternion::from_euler_angles(
            rng.gen_range(-PI..PI),
            rng.gen_range(-PI..PI),
            rng.gen_range(-PI..PI),
        )
    }

    #[test]
    fn test_flatten_identity_is_noop() {
        let pose = Pose::from_position(Vector3::new(1.0, 2.0, 3.0));
        let flat = flatten(&pose);

        assert_relative_eq!(flat.position, pose.position, epsilon = 1e-12);
        assert_relative_eq!(flat.rotation.angle(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_flatten_keeps_yaw_drops_pitch() {
        let yaw = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), FRAC_PI_4);
        let pitch = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.4);
        let pose = Pose::new(Vector3::new(0.5, 1.0, -2.0), yaw * pitch);

        let flat = flatten(&pose);

        assert_relative_eq!(flat.position, pose.position, epsilon = 1e-12);
        assert_relative_eq!(flat.rotation, yaw, epsilon = 1e-9);
    }

    #[test]
    fn test_flatten_degenerate_uses_canonical_forward() {
        // Forward straight down after the marker correction.
        let pose = Pose::new(Vector3::new(0.0, 0.0, 1.0), marker_to_floorplan());
        let flat = flatten(&pose);

        assert_relative_eq!(flat.forward(), CANONICAL_FORWARD, epsilon = 1e-12);
        assert_relative_eq!(flat.up(), WORLD_UP, epsilon = 1e-12);
    }

    #[test]
    fn test_flatten_straight_up_is_degenerate() {
        let pose = Pose::new(
            Vector3::zeros(),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -FRAC_PI_2),
        );
        assert_relative_eq!(horizontal_forward(&pose.rotation), CANONICAL_FORWARD);
        assert!(is_upright(&flatten(&pose), 1e-12));
    }

    #[test]
    fn test_flatten_random_rotations_always_upright() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..2000 {
            let pose = Pose::new(
                Vector3::new(
                    rng.gen_range(-5.0..5.0),
                    rng.gen_range(-5.0..5.0),
                    rng.gen_range(-5.0..5.0),
                ),
                random_rotation(&mut rng),
            );
            let flat = flatten(&pose);

            assert!(is_upright(&flat, 1e-9), "not upright: {:?}", flat.up());
            assert_relative_eq!(flat.forward().y, 0.0, epsilon = 1e-9);
            assert_relative_eq!(flat.rotation.norm(), 1.0, epsilon = 1e-12);
            assert_eq!(flat.position, pose.position);
        }
    }

    #[test]
    fn test_flatten_near_vertical_rotations_always_upright() {
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..500 {
            // Pitch within a hair of straight down, arbitrary yaw.
            let pitch = FRAC_PI_2 - rng.gen_range(0.0..0.02);
            let yaw = rng.gen_range(-PI..PI);
            let rot = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw)
                * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), pitch);

            let flat = flatten(&Pose::new(Vector3::zeros(), rot));
            assert!(is_upright(&flat, 1e-9));
        }
    }

    #[test]
    fn test_flatten_is_idempotent() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let pose = Pose::new(Vector3::zeros(), random_rotation(&mut rng));
            let once = flatten(&pose);
            let twice = flatten(&once);
            assert_relative_eq!(once.forward(), twice.forward(), epsilon = 1e-9);
        }
    }
}
