//! Geometry utilities: world poses, tilt removal, marker frame correction.

pub mod pose;
pub mod upright;

pub use pose::{CANONICAL_FORWARD, Pose, WORLD_UP, marker_to_floorplan};
pub use upright::{flatten, horizontal_forward, is_upright};
