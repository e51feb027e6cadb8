//! State shared between the router thread and the host.
//!
//! The router thread exclusively owns the floor selector, the overlay and the
//! anchor. The host only sees the `SessionStatus` snapshot published after
//! every handled wake-up, plus the control flags.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::anchor::{AnchorHandle, LifecycleStats};
use crate::geometry::Pose;

/// Read-only snapshot of the reconciliation state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionStatus {
    /// World pose of the overlay, `None` until the first marker placement.
    pub overlay_pose: Option<Pose>,
    pub current_anchor: Option<AnchorHandle>,
    pub floor_height: Option<f64>,
    pub pending_anchors: usize,
    pub subscribed: bool,
    pub anchors: LifecycleStats,
    /// Marker and plane batches the router has taken off its feeds.
    pub batches_handled: usize,
}

impl SessionStatus {
    /// Overlay placed, no request outstanding.
    pub fn is_settled(&self) -> bool {
        self.overlay_pose.is_some() && self.pending_anchors == 0
    }
}

/// Shared state accessible by the host and the router thread.
pub struct SharedState {
    /// Latest published snapshot. Written by the router thread only.
    pub status: RwLock<SessionStatus>,

    /// Whether the router should be subscribed to the observation feeds.
    observing: AtomicBool,

    /// Request the router thread to finish and exit.
    shutdown_requested: AtomicBool,
}

impl SharedState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.read()
    }

    pub fn publish(&self, status: SessionStatus) {
        *self.status.write() = status;
    }

    pub fn should_observe(&self) -> bool {
        self.observing.load(Ordering::SeqCst)
    }

    pub fn set_observing(&self, value: bool) {
        self.observing.store(value, Ordering::SeqCst);
    }

    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self {
            status: RwLock::new(SessionStatus::default()),
            observing: AtomicBool::new(true),
            shutdown_requested: AtomicBool::new(false),
        }
    }
}
