//! Recording overlay renderer.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::anchor::{AnchorHandle, OverlayRenderer};
use crate::geometry::Pose;

/// One command issued to the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverlayCommand {
    Spawn(Pose),
    SetWorldPose(Pose),
    SetParent {
        anchor: AnchorHandle,
        preserve_world_pose: bool,
    },
}

#[derive(Debug, Default)]
struct OverlayLog {
    commands: Vec<OverlayCommand>,
    spawn_count: usize,
    world_pose: Option<Pose>,
    parent: Option<AnchorHandle>,
}

/// Read side of a `RecordingOverlay`. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct OverlayProbe {
    log: Arc<Mutex<OverlayLog>>,
}

impl OverlayProbe {
    pub fn commands(&self) -> Vec<OverlayCommand> {
        self.log.lock().commands.clone()
    }

    pub fn spawn_count(&self) -> usize {
        self.log.lock().spawn_count
    }

    /// World pose after the last command, `None` before spawn.
    pub fn world_pose(&self) -> Option<Pose> {
        self.log.lock().world_pose
    }

    /// Anchor the overlay is currently parented to.
    pub fn parent(&self) -> Option<AnchorHandle> {
        self.log.lock().parent
    }
}

/// Renderer that only records what it was told to do.
#[derive(Debug, Default)]
pub struct RecordingOverlay {
    log: Arc<Mutex<OverlayLog>>,
}

impl RecordingOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe(&self) -> OverlayProbe {
        OverlayProbe {
            log: Arc::clone(&self.log),
        }
    }
}

impl OverlayRenderer for RecordingOverlay {
    fn spawn(&mut self, pose: &Pose) {
        let mut log = self.log.lock();
        log.commands.push(OverlayCommand::Spawn(*pose));
        log.spawn_count += 1;
        log.world_pose = Some(*pose);
    }

    fn set_world_pose(&mut self, pose: &Pose) {
        let mut log = self.log.lock();
        log.commands.push(OverlayCommand::SetWorldPose(*pose));
        log.world_pose = Some(*pose);
    }

    fn set_parent(&mut self, anchor: AnchorHandle, preserve_world_pose: bool) {
        let mut log = self.log.lock();
        log.commands.push(OverlayCommand::SetParent {
            anchor,
            preserve_world_pose,
        });
        log.parent = Some(anchor);
    }
}
