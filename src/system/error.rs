//! Setup failures that disable the reconciliation subsystem.

use thiserror::Error;

/// A required collaborator is missing or the configuration is unusable.
///
/// These are detected once at construction; the host session keeps running
/// with the subsystem disabled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    #[error("no marker tracking provider attached")]
    MissingMarkerFeed,
    #[error("no anchor provider attached")]
    MissingAnchorProvider,
    #[error("no overlay renderer (floorplan template) attached")]
    MissingOverlay,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
