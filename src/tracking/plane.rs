//! Detected surface planes.

use std::fmt;

use crate::geometry::Pose;

use super::changes::Trackable;

/// Provider-assigned identifier of a tracked plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaneId(pub u64);

impl fmt::Display for PlaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Orientation class of a detected plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaneAlignment {
    /// Floors, table tops: normal points up.
    HorizontalUp,
    /// Ceilings: normal points down.
    HorizontalDown,
    Vertical,
}

/// One plane observation: center pose plus alignment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneObservation {
    pub id: PlaneId,
    pub alignment: PlaneAlignment,
    pub pose: Pose,
}

impl PlaneObservation {
    pub fn new(id: PlaneId, alignment: PlaneAlignment, pose: Pose) -> Self {
        Self { id, alignment, pose }
    }

    /// World height of the plane center.
    #[inline]
    pub fn height(&self) -> f64 {
        self.pose.height()
    }

    pub fn is_floor_candidate(&self) -> bool {
        self.alignment == PlaneAlignment::HorizontalUp
    }
}

impl Trackable for PlaneObservation {
    type Id = PlaneId;

    fn id(&self) -> PlaneId {
        self.id
    }
}
