//! Session configuration.
//!
//! Loaded from YAML; every field has a default so an empty document is valid:
//!
//! ```yaml
//! target_marker: EntryMarker
//! marker_offset: [0.0, 0.0, 1.0]
//! max_person_height: 2.5
//! debug_log: true
//! ```

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use nalgebra::Vector3;
use serde::Deserialize;

use crate::floor::DEFAULT_MAX_PERSON_HEIGHT;

fn default_target_marker() -> String {
    "EntryMarker".to_string()
}

fn default_max_person_height() -> f64 {
    DEFAULT_MAX_PERSON_HEIGHT
}

fn default_debug_log() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnchorConfig {
    /// Reference image name the overlay is aligned to.
    #[serde(default = "default_target_marker")]
    pub target_marker: String,

    /// Offset from the marker to the overlay origin, in the marker's frame.
    #[serde(default)]
    pub marker_offset: [f64; 3],

    /// Deepest plausible floor below the device (m).
    #[serde(default = "default_max_person_height")]
    pub max_person_height: f64,

    /// Verbose placement logging.
    #[serde(default = "default_debug_log")]
    pub debug_log: bool,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            target_marker: default_target_marker(),
            marker_offset: [0.0; 3],
            max_person_height: default_max_person_height(),
            debug_log: default_debug_log(),
        }
    }
}

impl AnchorConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: AnchorConfig = serde_yaml::from_str(yaml).context("Invalid anchor config YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let config: AnchorConfig =
            serde_yaml::from_reader(file).with_context(|| format!("Failed to parse {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn marker_offset(&self) -> Vector3<f64> {
        Vector3::from(self.marker_offset)
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_marker.trim().is_empty() {
            bail!("target_marker must not be empty");
        }
        if self.marker_offset.iter().any(|v| !v.is_finite()) {
            bail!("marker_offset must be finite, got {:?}", self.marker_offset);
        }
        if !self.max_person_height.is_finite() || self.max_person_height <= 0.0 {
            bail!(
                "max_person_height must be a positive distance, got {}",
                self.max_person_height
            );
        }
        Ok(())
    }
}
