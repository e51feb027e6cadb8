//! In-memory collaborators for replay sessions and tests.
//!
//! - `SimAnchorProvider`: resolves anchors on background threads after a
//!   configurable latency, with scripted failures.
//! - `ManualAnchorProvider`: hands every request to a `ManualAnchorControl` so
//!   callers decide when and in which order requests resolve.
//! - `RecordingOverlay`: records renderer commands and the resulting state.

pub mod anchors;
pub mod overlay;

pub use anchors::{AnchorRegistry, ManualAnchorControl, ManualAnchorProvider, SimAnchorProvider};
pub use overlay::{OverlayCommand, OverlayProbe, RecordingOverlay};
