//! Scene-level context shared with presentation code.

mod route;

pub use route::{PathColor, PathStyle, RoutePreference, SceneContext};
