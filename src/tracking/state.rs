//! Tracking quality reported by the marker provider for each observation.

/// Tracking state of a single trackable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    /// Fully tracked this frame; the pose can be trusted.
    Tracking,
    /// Pose is an estimate (e.g. marker partially out of view).
    Limited,
    /// Not visible; the reported pose is stale.
    #[default]
    NotTracking,
}

impl TrackingState {
    /// Only fully tracked observations are allowed to move the overlay.
    pub fn is_tracking(self) -> bool {
        matches!(self, Self::Tracking)
    }
}
