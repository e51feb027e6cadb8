//! Rigid world pose used for markers, planes, anchors and the overlay.
//!
//! World convention follows the AR session: +Y is up, +Z is the canonical
//! forward direction, distances are in meters.

use std::f64::consts::FRAC_PI_2;

use nalgebra::{UnitQuaternion, Vector3};

/// World up axis.
pub const WORLD_UP: Vector3<f64> = Vector3::new(0.0, 1.0, 0.0);

/// Forward axis used whenever a pose has no usable horizontal heading.
pub const CANONICAL_FORWARD: Vector3<f64> = Vector3::new(0.0, 0.0, 1.0);

/// Position + orientation in world space.
///
/// The rotation is a `UnitQuaternion`, so it stays normalized through every
/// composition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
}

impl Pose {
    pub fn new(position: Vector3<f64>, rotation: UnitQuaternion<f64>) -> Self {
        Self { position, rotation }
    }

    /// Pose at the origin with no rotation.
    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Pure translation.
    pub fn from_position(position: Vector3<f64>) -> Self {
        Self {
            position,
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Vertical coordinate of the pose.
    #[inline]
    pub fn height(&self) -> f64 {
        self.position.y
    }

    /// Copy of this pose with its vertical coordinate replaced.
    pub fn with_height(&self, height: f64) -> Self {
        let mut out = *self;
        out.position.y = height;
        out
    }

    /// Local +Z expressed in world space.
    #[inline]
    pub fn forward(&self) -> Vector3<f64> {
        self.rotation * CANONICAL_FORWARD
    }

    /// Local +Y expressed in world space.
    #[inline]
    pub fn up(&self) -> Vector3<f64> {
        self.rotation * WORLD_UP
    }

    /// Translate by `local_offset` expressed in this pose's own frame.
    ///
    /// The rotation is left untouched: this places a child origin relative to
    /// the pose regardless of how the pose itself is tilted.
    pub fn offset_by(&self, local_offset: &Vector3<f64>) -> Self {
        Self {
            position: self.position + self.rotation * local_offset,
            rotation: self.rotation,
        }
    }

    /// Compose two poses: `self * other` (apply `other` in `self`'s frame).
    pub fn compose(&self, other: &Pose) -> Self {
        Self {
            position: self.position + self.rotation * other.position,
            rotation: self.rotation * other.rotation,
        }
    }

    /// Inverse transformation.
    pub fn inverse(&self) -> Self {
        let inv_rot = self.rotation.inverse();
        Self {
            position: -(inv_rot * self.position),
            rotation: inv_rot,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// Fixed correction from a tracked marker frame to the floorplan model frame.
///
/// Image markers are reported lying in their own XZ plane while the floorplan
/// model is authored standing upright, so the model is turned a quarter turn
/// about the marker's lateral (X) axis.
pub fn marker_to_floorplan() -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2)
}
