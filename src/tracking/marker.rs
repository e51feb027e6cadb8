//! Image marker observations.

use std::fmt;

use crate::geometry::Pose;

use super::changes::Trackable;
use super::state::TrackingState;

/// Provider-assigned identifier of a tracked image marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerId(pub u64);

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.0)
    }
}

/// One marker observation as delivered by the image tracking provider.
///
/// Lives only as long as the event carrying it; nothing keeps marker history.
#[derive(Debug, Clone)]
pub struct MarkerObservation {
    pub id: MarkerId,
    /// Name of the reference image the marker was matched against.
    pub name: String,
    pub pose: Pose,
    pub tracking_state: TrackingState,
}

impl MarkerObservation {
    pub fn new(id: MarkerId, name: impl Into<String>, pose: Pose, state: TrackingState) -> Self {
        Self {
            id,
            name: name.into(),
            pose,
            tracking_state: state,
        }
    }
}

impl Trackable for MarkerObservation {
    type Id = MarkerId;

    fn id(&self) -> MarkerId {
        self.id
    }
}
