//! Lowest-plausible-floor heuristic.
//!
//! Heights are world Y relative to the session origin, which sits at the
//! device. A floor candidate must be a horizontal-up plane strictly inside the
//! band `(-max_person_height, 0)`, and once a floor is tracked a candidate only
//! replaces it when strictly lower. The tracked height therefore only ever
//! tightens downward until the tracked plane is removed.

use tracing::debug;

use crate::geometry::Pose;
use crate::tracking::{PlaneId, PlaneObservation};

/// Default depth band below the device in which floors are accepted (m).
pub const DEFAULT_MAX_PERSON_HEIGHT: f64 = 2.5;

/// The plane currently judged to be the floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloorPlane {
    pub id: PlaneId,
    pub pose: Pose,
}

impl FloorPlane {
    #[inline]
    pub fn height(&self) -> f64 {
        self.pose.height()
    }
}

/// Result of feeding one plane observation to the selector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FloorUpdate {
    /// The plane became the tracked floor at this height.
    Accepted(f64),
    /// Not a horizontal-up plane.
    NotCandidate,
    /// Outside the plausible band below the device.
    OutOfBand,
    /// Inside the band but not lower than the tracked floor.
    NotLower,
}

impl FloorUpdate {
    pub fn accepted_height(self) -> Option<f64> {
        match self {
            Self::Accepted(h) => Some(h),
            _ => None,
        }
    }
}

/// Tracks the lowest plausible floor plane.
#[derive(Debug, Clone)]
pub struct FloorSelector {
    max_person_height: f64,
    lowest: Option<FloorPlane>,
}

impl FloorSelector {
    pub fn new(max_person_height: f64) -> Self {
        Self {
            max_person_height,
            lowest: None,
        }
    }

    pub fn max_person_height(&self) -> f64 {
        self.max_person_height
    }

    /// Currently tracked floor plane, if any.
    pub fn lowest_floor(&self) -> Option<&FloorPlane> {
        self.lowest.as_ref()
    }

    /// Height of the tracked floor, if known.
    pub fn floor_height(&self) -> Option<f64> {
        self.lowest.map(|p| p.height())
    }

    fn in_band(&self, height: f64) -> bool {
        height < 0.0 && height > -self.max_person_height
    }

    /// Handle an added or updated plane.
    pub fn on_plane_added_or_updated(&mut self, plane: &PlaneObservation) -> FloorUpdate {
        if !plane.is_floor_candidate() {
            return FloorUpdate::NotCandidate;
        }

        let height = plane.height();
        if !self.in_band(height) {
            debug!(plane = %plane.id, height, "floor candidate outside plausible band");
            return FloorUpdate::OutOfBand;
        }

        if let Some(current) = &self.lowest {
            if height >= current.height() {
                return FloorUpdate::NotLower;
            }
        }

        self.lowest = Some(FloorPlane {
            id: plane.id,
            pose: plane.pose,
        });
        debug!(plane = %plane.id, height, "tracking new lowest floor plane");
        FloorUpdate::Accepted(height)
    }

    /// Handle a removed plane. Returns true if it was the tracked floor.
    ///
    /// No replacement is chosen; the next acceptable candidate re-acquires.
    pub fn on_plane_removed(&mut self, id: PlaneId) -> bool {
        match self.lowest {
            Some(current) if current.id == id => {
                self.lowest = None;
                debug!(plane = %id, "tracked floor plane removed");
                true
            }
            _ => false,
        }
    }
}

impl Default for FloorSelector {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PERSON_HEIGHT)
    }
}
