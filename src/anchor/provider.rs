//! Outbound collaborator interfaces: the anchor provider and the overlay
//! renderer. Only `AnchorLifecycle` calls into either of them.

use crate::geometry::Pose;

use super::types::{AnchorHandle, PendingAnchor};

/// Creates and destroys spatial anchors.
pub trait AnchorProvider: Send {
    /// Request an anchor at `pose`. Must not block; the returned task
    /// resolves once the provider has an answer.
    fn create_anchor(&mut self, pose: &Pose) -> PendingAnchor;

    /// Destroy a previously created anchor.
    fn destroy_anchor(&mut self, handle: AnchorHandle);
}

/// Owns the floorplan model instance in the scene.
pub trait OverlayRenderer: Send {
    /// Instantiate the overlay at `pose`. Called once per session.
    fn spawn(&mut self, pose: &Pose);

    /// Move the overlay to `pose` in world space.
    fn set_world_pose(&mut self, pose: &Pose);

    /// Re-parent the overlay onto `anchor`. With `preserve_world_pose` the
    /// overlay's world transform must not change.
    fn set_parent(&mut self, anchor: AnchorHandle, preserve_world_pose: bool);
}
