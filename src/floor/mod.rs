//! Floor selection: pick the plane most likely to be the real floor from a
//! stream of plane observations.

mod selector;

pub use selector::{FloorPlane, FloorSelector, FloorUpdate, DEFAULT_MAX_PERSON_HEIGHT};
