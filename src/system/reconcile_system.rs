//! Reconcile System - session entry point and thread orchestration.
//!
//! The `ReconcileSystem` is the top-level struct a host session interacts
//! with. It owns the shared state and spawns the router thread. A setup
//! failure never propagates: the system comes up disabled and says why.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{error, info};

use super::config::AnchorConfig;
use super::error::SetupError;
use super::router::{Collaborators, ObservationRouter};
use super::shared_state::{SessionStatus, SharedState};

/// Poll interval of `wait_until`.
const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Marker + plane anchoring for one AR session.
pub struct ReconcileSystem {
    /// Shared state (status snapshot, flags) accessible by both threads.
    shared: Arc<SharedState>,

    /// Handle to the router thread, `None` when disabled or shut down.
    router_handle: Option<JoinHandle<()>>,

    /// Why the subsystem is disabled, if it is.
    setup_error: Option<SetupError>,
}

impl ReconcileSystem {
    /// Validate collaborators and start the router thread.
    pub fn new(config: AnchorConfig, collaborators: Collaborators) -> Self {
        let shared = SharedState::new();

        match ObservationRouter::new(config, collaborators) {
            Ok(router) => {
                let router_handle = Self::spawn_router(Arc::clone(&shared), router);
                info!("floorplan anchoring started");
                Self {
                    shared,
                    router_handle: Some(router_handle),
                    setup_error: None,
                }
            }
            Err(err) => {
                error!(error = %err, "floorplan anchoring disabled");
                Self {
                    shared,
                    router_handle: None,
                    setup_error: Some(err),
                }
            }
        }
    }

    fn spawn_router(shared: Arc<SharedState>, mut router: ObservationRouter) -> JoinHandle<()> {
        thread::spawn(move || {
            router.run(shared);
        })
    }

    /// False if setup failed or the system was shut down.
    pub fn is_enabled(&self) -> bool {
        self.router_handle.is_some()
    }

    pub fn setup_error(&self) -> Option<&SetupError> {
        self.setup_error.as_ref()
    }

    pub fn shared_state(&self) -> &Arc<SharedState> {
        &self.shared
    }

    /// Latest status snapshot published by the router thread.
    pub fn status(&self) -> SessionStatus {
        self.shared.status()
    }

    /// Subscribe to (`true`) or detach from (`false`) the observation feeds.
    ///
    /// Takes effect on the router thread's next wake-up.
    pub fn set_observing(&self, observing: bool) {
        self.shared.set_observing(observing);
    }

    /// Poll the status until `predicate` holds or `timeout` elapses.
    pub fn wait_until<F>(&self, timeout: Duration, predicate: F) -> Option<SessionStatus>
    where
        F: Fn(&SessionStatus) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            let status = self.status();
            if predicate(&status) {
                return Some(status);
            }
            if Instant::now() >= deadline {
                return None;
            }
            thread::sleep(STATUS_POLL_INTERVAL);
        }
    }

    /// Stop the router thread and wait for it.
    ///
    /// The router unsubscribes and gives outstanding anchor requests a short
    /// grace period before exiting.
    pub fn shutdown(&mut self) {
        self.shared.request_shutdown();

        if let Some(handle) = self.router_handle.take() {
            if handle.join().is_err() {
                error!("router thread panicked");
            }
        }
    }
}

impl Drop for ReconcileSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}
