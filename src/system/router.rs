//! Observation Router.
//!
//! Consumes the marker and plane feeds on a single thread of control,
//! computes target poses and drives the floor selector and the anchor
//! lifecycle. All mutation of shared session state happens here, one event
//! at a time; anchor creation is the only asynchronous step and its
//! completions come back through the same loop.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Select};
use nalgebra::Vector3;
use tracing::{debug, info, warn};

use crate::anchor::{
    AnchorError, AnchorLifecycle, AnchorProvider, AnchorResult, CompletionOutcome, OverlayRenderer,
    ReconcileTicket,
};
use crate::floor::FloorSelector;
use crate::geometry::{Pose, flatten, marker_to_floorplan};
use crate::tracking::{
    EventFeed, MarkerChanges, MarkerObservation, PlaneChanges, PlaneId, PlaneObservation,
    Subscription,
};

use super::config::AnchorConfig;
use super::error::SetupError;
use super::messages::RouterEvent;
use super::shared_state::{SessionStatus, SharedState};

/// Receive timeout. Bounds how long shutdown and observing changes wait.
const RECV_TIMEOUT: Duration = Duration::from_millis(50);

/// How long shutdown waits for outstanding anchor requests.
const SHUTDOWN_SETTLE_TIMEOUT: Duration = Duration::from_millis(500);

/// External collaborators handed to the router at construction.
///
/// The plane feed is optional: without it the overlay stays at marker height.
#[derive(Default)]
pub struct Collaborators {
    pub marker_feed: Option<Arc<EventFeed<MarkerChanges>>>,
    pub plane_feed: Option<Arc<EventFeed<PlaneChanges>>>,
    pub anchor_provider: Option<Box<dyn AnchorProvider>>,
    pub overlay: Option<Box<dyn OverlayRenderer>>,
}

impl Collaborators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_marker_feed(mut self, feed: Arc<EventFeed<MarkerChanges>>) -> Self {
        self.marker_feed = Some(feed);
        self
    }

    pub fn with_plane_feed(mut self, feed: Arc<EventFeed<PlaneChanges>>) -> Self {
        self.plane_feed = Some(feed);
        self
    }

    pub fn with_anchor_provider<P: AnchorProvider + 'static>(mut self, provider: P) -> Self {
        self.anchor_provider = Some(Box::new(provider));
        self
    }

    pub fn with_overlay<R: OverlayRenderer + 'static>(mut self, overlay: R) -> Self {
        self.overlay = Some(Box::new(overlay));
        self
    }
}

/// Receivers registered for one `Select` round.
enum Source<'a> {
    Markers(&'a Receiver<MarkerChanges>),
    Planes(&'a Receiver<PlaneChanges>),
    Anchor(ReconcileTicket, &'a Receiver<AnchorResult>),
}

pub struct ObservationRouter {
    config: AnchorConfig,
    marker_offset: Vector3<f64>,
    marker_feed: Arc<EventFeed<MarkerChanges>>,
    plane_feed: Option<Arc<EventFeed<PlaneChanges>>>,
    marker_sub: Option<Subscription<MarkerChanges>>,
    plane_sub: Option<Subscription<PlaneChanges>>,
    floor: FloorSelector,
    lifecycle: AnchorLifecycle,
    /// Marker and plane batches dispatched so far.
    batches_handled: usize,
}

impl ObservationRouter {
    /// Validate the configuration and collaborators.
    pub fn new(config: AnchorConfig, collaborators: Collaborators) -> Result<Self, SetupError> {
        config
            .validate()
            .map_err(|e| SetupError::InvalidConfig(e.to_string()))?;

        let Collaborators {
            marker_feed,
            plane_feed,
            anchor_provider,
            overlay,
        } = collaborators;
        let marker_feed = marker_feed.ok_or(SetupError::MissingMarkerFeed)?;
        let anchor_provider = anchor_provider.ok_or(SetupError::MissingAnchorProvider)?;
        let overlay = overlay.ok_or(SetupError::MissingOverlay)?;

        if plane_feed.is_none() {
            warn!("no plane tracking provider; floor refinement disabled");
        }

        Ok(Self {
            marker_offset: config.marker_offset(),
            floor: FloorSelector::new(config.max_person_height),
            lifecycle: AnchorLifecycle::new(anchor_provider, overlay).with_debug_log(config.debug_log),
            config,
            marker_feed,
            plane_feed,
            marker_sub: None,
            plane_sub: None,
            batches_handled: 0,
        })
    }

    pub fn config(&self) -> &AnchorConfig {
        &self.config
    }

    pub fn floor(&self) -> &FloorSelector {
        &self.floor
    }

    pub fn lifecycle(&self) -> &AnchorLifecycle {
        &self.lifecycle
    }

    pub fn is_subscribed(&self) -> bool {
        self.marker_sub.is_some()
    }

    /// Subscribe to the observation feeds. Returns false if already subscribed.
    pub fn start(&mut self) -> bool {
        if self.marker_sub.is_some() {
            return false;
        }
        self.marker_sub = Some(self.marker_feed.subscribe());
        self.plane_sub = self.plane_feed.as_ref().map(|feed| feed.subscribe());
        debug!("observation router subscribed");
        true
    }

    /// Unsubscribe from the observation feeds. Returns false if not subscribed.
    ///
    /// Outstanding anchor requests keep resolving normally.
    pub fn stop(&mut self) -> bool {
        let Some(marker_sub) = self.marker_sub.take() else {
            return false;
        };
        self.marker_feed.unsubscribe(marker_sub.id());
        if let (Some(feed), Some(sub)) = (&self.plane_feed, self.plane_sub.take()) {
            feed.unsubscribe(sub.id());
        }
        debug!("observation router unsubscribed");
        true
    }

    /// Overlay target for a marker observation: offset into the marker frame,
    /// turn upright, flatten, then snap to the known floor.
    pub fn marker_target_pose(&self, marker: &MarkerObservation) -> Pose {
        let mut raw = marker.pose.offset_by(&self.marker_offset);
        raw.rotation = raw.rotation * marker_to_floorplan();

        let target = flatten(&raw);
        match self.floor.floor_height() {
            Some(height) => target.with_height(height),
            None => target,
        }
    }

    pub fn handle_marker_changes(&mut self, changes: &MarkerChanges) {
        for marker in changes.upserts() {
            self.on_marker(marker);
        }
        for id in &changes.removed {
            debug!(marker = %id, "marker removed, overlay left in place");
        }
    }

    /// Handle an added or updated marker.
    pub fn on_marker(&mut self, marker: &MarkerObservation) -> Option<ReconcileTicket> {
        if marker.name != self.config.target_marker {
            return None;
        }
        if !marker.tracking_state.is_tracking() {
            debug!(marker = %marker.id, state = ?marker.tracking_state, "target marker not tracking");
            return None;
        }

        let target = self.marker_target_pose(marker);
        if self.config.debug_log {
            info!(marker = %marker.id, floor = ?self.floor.floor_height(), "refining floorplan using image marker");
        }
        Some(self.lifecycle.reconcile(target))
    }

    pub fn handle_plane_changes(&mut self, changes: &PlaneChanges) {
        for plane in changes.upserts() {
            self.on_plane(plane);
        }
        for id in &changes.removed {
            self.on_plane_removed(*id);
        }
    }

    /// Handle an added or updated plane. Settles an existing overlay onto a
    /// newly accepted floor.
    pub fn on_plane(&mut self, plane: &PlaneObservation) -> Option<ReconcileTicket> {
        let height = self.floor.on_plane_added_or_updated(plane).accepted_height()?;
        let overlay_pose = self.lifecycle.overlay_pose()?;

        let target = flatten(&overlay_pose).with_height(height);
        if self.config.debug_log {
            info!(plane = %plane.id, height, "settling floorplan onto floor plane");
        }
        Some(self.lifecycle.reconcile(target))
    }

    /// Handle a removed plane. The overlay keeps its last height.
    pub fn on_plane_removed(&mut self, id: PlaneId) {
        if self.floor.on_plane_removed(id) {
            info!(plane = %id, "tracked floor plane lost, keeping overlay height");
        }
    }

    pub fn handle_anchor_completion(
        &mut self,
        ticket: ReconcileTicket,
        result: AnchorResult,
    ) -> CompletionOutcome {
        self.lifecycle.complete(ticket, result)
    }

    /// Apply anchor requests that already resolved.
    pub fn poll_anchors(&mut self) -> usize {
        self.lifecycle.poll_completions().len()
    }

    pub fn dispatch(&mut self, event: RouterEvent) {
        match event {
            RouterEvent::Markers(changes) => {
                self.batches_handled += 1;
                self.handle_marker_changes(&changes);
            }
            RouterEvent::Planes(changes) => {
                self.batches_handled += 1;
                self.handle_plane_changes(&changes);
            }
            RouterEvent::Anchor(ticket, result) => {
                self.handle_anchor_completion(ticket, result);
            }
        }
    }

    /// Block up to `timeout` for the next feed batch or anchor completion.
    pub fn wait_next(&self, timeout: Duration) -> Option<RouterEvent> {
        let mut sources = Vec::new();
        if let Some(sub) = &self.marker_sub {
            sources.push(Source::Markers(sub.receiver()));
        }
        if let Some(sub) = &self.plane_sub {
            sources.push(Source::Planes(sub.receiver()));
        }
        for (ticket, rx) in self.lifecycle.pending_receivers() {
            sources.push(Source::Anchor(ticket, rx));
        }

        if sources.is_empty() {
            thread::sleep(timeout);
            return None;
        }

        let mut sel = Select::new();
        for source in &sources {
            match source {
                Source::Markers(rx) => sel.recv(rx),
                Source::Planes(rx) => sel.recv(rx),
                Source::Anchor(_, rx) => sel.recv(rx),
            };
        }

        let oper = sel.select_timeout(timeout).ok()?;
        match &sources[oper.index()] {
            Source::Markers(rx) => oper.recv(rx).ok().map(RouterEvent::Markers),
            Source::Planes(rx) => oper.recv(rx).ok().map(RouterEvent::Planes),
            Source::Anchor(ticket, rx) => Some(RouterEvent::Anchor(
                *ticket,
                oper.recv(rx).unwrap_or(Err(AnchorError::Abandoned)),
            )),
        }
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            overlay_pose: self.lifecycle.overlay_pose(),
            current_anchor: self.lifecycle.current_anchor(),
            floor_height: self.floor.floor_height(),
            pending_anchors: self.lifecycle.in_flight_count(),
            subscribed: self.is_subscribed(),
            anchors: self.lifecycle.stats(),
            batches_handled: self.batches_handled,
        }
    }

    /// Main thread loop: follow the observing flag, handle one event at a
    /// time and publish a status snapshot after each wake-up.
    ///
    /// Runs until shutdown is requested, then unsubscribes and gives
    /// outstanding anchor requests a short grace period.
    pub fn run(&mut self, shared: Arc<SharedState>) {
        loop {
            if shared.is_shutdown_requested() {
                break;
            }

            if shared.should_observe() {
                self.start();
            } else {
                self.stop();
            }

            if let Some(event) = self.wait_next(RECV_TIMEOUT) {
                self.dispatch(event);
            }
            shared.publish(self.status());
        }

        self.stop();
        let unresolved = self.lifecycle.settle(SHUTDOWN_SETTLE_TIMEOUT);
        if unresolved > 0 {
            warn!(unresolved, "anchor requests still pending at shutdown");
        }
        shared.publish(self.status());
    }
}
