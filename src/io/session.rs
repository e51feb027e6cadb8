//! YAML session scripts: a recorded or hand-written sequence of provider
//! events replayed into the observation feeds.
//!
//! ```yaml
//! steps:
//!   - marker: { id: 1, name: EntryMarker, position: [0, 0, 0], change: added }
//!   - wait_ms: 20
//!   - plane: { id: 7, position: [0, -0.9, 0] }
//!   - remove_plane: 7
//! ```

use std::fs::File;
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use nalgebra::{UnitQuaternion, Vector3};
use serde::Deserialize;
use tracing::debug;

use crate::geometry::Pose;
use crate::tracking::{
    ChangeSet, EventFeed, MarkerChanges, MarkerId, MarkerObservation, PlaneAlignment, PlaneChanges,
    PlaneId, PlaneObservation, TrackingState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Change {
    Added,
    #[default]
    Updated,
}

fn default_tracking() -> TrackingState {
    TrackingState::Tracking
}

fn default_alignment() -> PlaneAlignment {
    PlaneAlignment::HorizontalUp
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkerStep {
    pub id: u64,
    pub name: String,
    pub position: [f64; 3],
    /// Roll, pitch, yaw in degrees.
    #[serde(default)]
    pub rotation_deg: [f64; 3],
    #[serde(default = "default_tracking")]
    pub state: TrackingState,
    #[serde(default)]
    pub change: Change,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlaneStep {
    pub id: u64,
    #[serde(default = "default_alignment")]
    pub alignment: PlaneAlignment,
    pub position: [f64; 3],
    #[serde(default)]
    pub change: Change,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptStep {
    Marker(MarkerStep),
    Plane(PlaneStep),
    RemoveMarker(u64),
    RemovePlane(u64),
    WaitMs(u64),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionScript {
    /// Each step is a single-key map, e.g. `- wait_ms: 5`.
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub steps: Vec<ScriptStep>,
}

/// Counts from one replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub marker_batches: usize,
    pub plane_batches: usize,
    /// Batches published while nobody was subscribed.
    pub dropped: usize,
}

impl ReplaySummary {
    /// Batches that reached at least one subscriber.
    pub fn delivered(&self) -> usize {
        self.marker_batches + self.plane_batches - self.dropped
    }
}

fn rotation_from_degrees(rpy: &[f64; 3]) -> UnitQuaternion<f64> {
    UnitQuaternion::from_euler_angles(rpy[0].to_radians(), rpy[1].to_radians(), rpy[2].to_radians())
}

impl MarkerStep {
    pub fn observation(&self) -> MarkerObservation {
        MarkerObservation::new(
            MarkerId(self.id),
            self.name.clone(),
            Pose::new(Vector3::from(self.position), rotation_from_degrees(&self.rotation_deg)),
            self.state,
        )
    }
}

impl PlaneStep {
    pub fn observation(&self) -> PlaneObservation {
        PlaneObservation::new(
            PlaneId(self.id),
            self.alignment,
            Pose::from_position(Vector3::from(self.position)),
        )
    }
}

impl SessionScript {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let script: SessionScript = serde_yaml::from_str(yaml).context("Invalid session script")?;
        script.validate()?;
        Ok(script)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let script: SessionScript =
            serde_yaml::from_reader(file).with_context(|| format!("Failed to parse {:?}", path))?;
        script.validate()?;
        Ok(script)
    }

    fn validate(&self) -> Result<()> {
        for (i, step) in self.steps.iter().enumerate() {
            let position = match step {
                ScriptStep::Marker(m) => &m.position,
                ScriptStep::Plane(p) => &p.position,
                _ => continue,
            };
            if position.iter().any(|v| !v.is_finite()) {
                bail!("step {}: position must be finite, got {:?}", i, position);
            }
        }
        Ok(())
    }

    /// Publish every step into the feeds, sleeping on `wait_ms` steps.
    pub fn replay(
        &self,
        markers: &EventFeed<MarkerChanges>,
        planes: &EventFeed<PlaneChanges>,
    ) -> ReplaySummary {
        let mut summary = ReplaySummary::default();

        for step in &self.steps {
            let delivered = match step {
                ScriptStep::Marker(m) => {
                    summary.marker_batches += 1;
                    let obs = m.observation();
                    let batch = match m.change {
                        Change::Added => ChangeSet::added(obs),
                        Change::Updated => ChangeSet::updated(obs),
                    };
                    markers.publish(batch)
                }
                ScriptStep::Plane(p) => {
                    summary.plane_batches += 1;
                    let obs = p.observation();
                    let batch = match p.change {
                        Change::Added => ChangeSet::added(obs),
                        Change::Updated => ChangeSet::updated(obs),
                    };
                    planes.publish(batch)
                }
                ScriptStep::RemoveMarker(id) => {
                    summary.marker_batches += 1;
                    markers.publish(ChangeSet::removed(MarkerId(*id)))
                }
                ScriptStep::RemovePlane(id) => {
                    summary.plane_batches += 1;
                    planes.publish(ChangeSet::removed(PlaneId(*id)))
                }
                ScriptStep::WaitMs(ms) => {
                    thread::sleep(Duration::from_millis(*ms));
                    continue;
                }
            };
            if delivered == 0 {
                summary.dropped += 1;
                debug!(?step, "no subscriber for scripted event");
            }
        }
        summary
    }
}
