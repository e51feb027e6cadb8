//! Anchor Lifecycle Manager.
//!
//! Owns the overlay instance and the single current anchor. Every
//! `reconcile` call:
//! 1. Spawns the overlay on first use, otherwise moves it synchronously.
//! 2. Requests a new anchor at the target pose (asynchronous).
//!
//! Completions are fed back through `complete` (or `poll_completions`). Each
//! request carries a sequence number; a successful completion is adopted only
//! if no newer request has been adopted yet. Adoption destroys the previous
//! anchor and re-parents the overlay while preserving its world pose. A
//! superseded success is destroyed straight away. A failure changes nothing,
//! so an existing anchor is never lost to a failed create.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Select};
use tracing::{debug, info, warn};

use crate::geometry::Pose;

use super::provider::{AnchorProvider, OverlayRenderer};
use super::types::{AnchorError, AnchorHandle, AnchorResult, PendingAnchor};

/// Sequence number identifying one `reconcile` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReconcileTicket(pub u64);

/// The overlay instance as this manager last placed it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayState {
    pub pose: Pose,
}

/// What happened to one completed anchor request.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    /// The new anchor became current; `replaced` was destroyed.
    Adopted {
        anchor: AnchorHandle,
        replaced: Option<AnchorHandle>,
    },
    /// A newer request was already adopted; the anchor was destroyed.
    Superseded { anchor: AnchorHandle },
    /// Creation failed; the current anchor (if any) was kept.
    Failed(AnchorError),
    /// No in-flight request with this ticket.
    Unknown,
}

/// Counters over the lifetime of the manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleStats {
    pub reconciles: u64,
    pub adopted: u64,
    pub failed: u64,
    pub superseded: u64,
}

struct InFlight {
    ticket: ReconcileTicket,
    pose: Pose,
    pending: PendingAnchor,
}

/// Exclusive owner of the overlay and its anchor.
pub struct AnchorLifecycle {
    provider: Box<dyn AnchorProvider>,
    renderer: Box<dyn OverlayRenderer>,
    overlay: Option<OverlayState>,
    current_anchor: Option<AnchorHandle>,
    last_ticket: u64,
    adopted_ticket: u64,
    in_flight: Vec<InFlight>,
    stats: LifecycleStats,
    debug_log: bool,
}

impl AnchorLifecycle {
    pub fn new(provider: Box<dyn AnchorProvider>, renderer: Box<dyn OverlayRenderer>) -> Self {
        Self {
            provider,
            renderer,
            overlay: None,
            current_anchor: None,
            last_ticket: 0,
            adopted_ticket: 0,
            in_flight: Vec::new(),
            stats: LifecycleStats::default(),
            debug_log: false,
        }
    }

    /// Log every placement step at info level.
    pub fn with_debug_log(mut self, enabled: bool) -> Self {
        self.debug_log = enabled;
        self
    }

    pub fn overlay(&self) -> Option<&OverlayState> {
        self.overlay.as_ref()
    }

    pub fn overlay_pose(&self) -> Option<Pose> {
        self.overlay.map(|o| o.pose)
    }

    pub fn current_anchor(&self) -> Option<AnchorHandle> {
        self.current_anchor
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// True when no anchor request is outstanding.
    pub fn is_settled(&self) -> bool {
        self.in_flight.is_empty()
    }

    pub fn stats(&self) -> LifecycleStats {
        self.stats
    }

    /// Target pose of an outstanding request.
    pub fn in_flight_pose(&self, ticket: ReconcileTicket) -> Option<Pose> {
        self.in_flight
            .iter()
            .find(|f| f.ticket == ticket)
            .map(|f| f.pose)
    }

    /// Outstanding requests with their receivers, for multiplexing.
    pub fn pending_receivers(&self) -> impl Iterator<Item = (ReconcileTicket, &Receiver<AnchorResult>)> {
        self.in_flight.iter().map(|f| (f.ticket, f.pending.receiver()))
    }

    /// Move the overlay to `target` and request an anchor there.
    pub fn reconcile(&mut self, target: Pose) -> ReconcileTicket {
        match self.overlay.as_mut() {
            None => {
                self.renderer.spawn(&target);
                self.overlay = Some(OverlayState { pose: target });
                info!(
                    x = target.position.x,
                    y = target.position.y,
                    z = target.position.z,
                    "floorplan overlay spawned"
                );
            }
            Some(overlay) => {
                self.renderer.set_world_pose(&target);
                overlay.pose = target;
            }
        }

        self.last_ticket += 1;
        let ticket = ReconcileTicket(self.last_ticket);
        let pending = self.provider.create_anchor(&target);
        self.in_flight.push(InFlight {
            ticket,
            pose: target,
            pending,
        });
        self.stats.reconciles += 1;

        if self.debug_log {
            info!(
                ticket = ticket.0,
                y = target.position.y,
                in_flight = self.in_flight.len(),
                "anchor requested"
            );
        }
        ticket
    }

    /// Apply the result of the request identified by `ticket`.
    pub fn complete(&mut self, ticket: ReconcileTicket, result: AnchorResult) -> CompletionOutcome {
        let Some(idx) = self.in_flight.iter().position(|f| f.ticket == ticket) else {
            debug!(ticket = ticket.0, "completion for unknown anchor request ignored");
            return CompletionOutcome::Unknown;
        };
        self.in_flight.swap_remove(idx);

        match result {
            Ok(anchor) if ticket.0 <= self.adopted_ticket => {
                self.provider.destroy_anchor(anchor);
                self.stats.superseded += 1;
                debug!(
                    ticket = ticket.0,
                    adopted = self.adopted_ticket,
                    %anchor,
                    "stale anchor discarded"
                );
                CompletionOutcome::Superseded { anchor }
            }
            Ok(anchor) => {
                // Re-parent before destroying the old anchor so the overlay
                // is never attached to a dead parent.
                self.renderer.set_parent(anchor, true);
                let replaced = self.current_anchor.replace(anchor);
                if let Some(old) = replaced {
                    self.provider.destroy_anchor(old);
                }
                self.adopted_ticket = ticket.0;
                self.stats.adopted += 1;

                if self.debug_log {
                    match replaced {
                        Some(old) => info!(ticket = ticket.0, %anchor, replaced = %old, "overlay re-anchored"),
                        None => info!(ticket = ticket.0, %anchor, "overlay anchored"),
                    }
                }
                CompletionOutcome::Adopted { anchor, replaced }
            }
            Err(err) => {
                self.stats.failed += 1;
                warn!(
                    ticket = ticket.0,
                    error = %err,
                    kept = ?self.current_anchor,
                    "anchor creation failed, keeping previous anchor"
                );
                CompletionOutcome::Failed(err)
            }
        }
    }

    /// Apply every request that has already resolved, oldest first.
    pub fn poll_completions(&mut self) -> Vec<(ReconcileTicket, CompletionOutcome)> {
        let mut ready: Vec<(ReconcileTicket, AnchorResult)> = self
            .in_flight
            .iter()
            .filter_map(|f| f.pending.try_resolve().map(|r| (f.ticket, r)))
            .collect();
        ready.sort_by_key(|(t, _)| *t);

        ready
            .into_iter()
            .map(|(ticket, result)| (ticket, self.complete(ticket, result)))
            .collect()
    }

    /// Block up to `timeout` for the next request to resolve and apply it.
    pub fn wait_next(&mut self, timeout: Duration) -> Option<(ReconcileTicket, CompletionOutcome)> {
        let (ticket, result) = {
            let tickets: Vec<ReconcileTicket> = self.in_flight.iter().map(|f| f.ticket).collect();
            if tickets.is_empty() {
                return None;
            }
            let mut sel = Select::new();
            for f in &self.in_flight {
                sel.recv(f.pending.receiver());
            }
            let oper = sel.select_timeout(timeout).ok()?;
            let idx = oper.index();
            let result = oper
                .recv(self.in_flight[idx].pending.receiver())
                .unwrap_or(Err(AnchorError::Abandoned));
            (tickets[idx], result)
        };
        Some((ticket, self.complete(ticket, result)))
    }

    /// Wait for outstanding requests until `timeout` elapses.
    ///
    /// Returns the number of requests still unresolved.
    pub fn settle(&mut self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        while !self.in_flight.is_empty() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            self.wait_next(deadline - now);
        }
        self.in_flight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{
        AnchorRegistry, ManualAnchorControl, ManualAnchorProvider, OverlayCommand, OverlayProbe,
        RecordingOverlay, SimAnchorProvider,
    };
    use nalgebra::Vector3;

    fn manual() -> (AnchorLifecycle, ManualAnchorControl, AnchorRegistry, OverlayProbe) {
        let registry = AnchorRegistry::new();
        let provider = ManualAnchorProvider::new(registry.clone());
        let control = provider.control();
        let overlay = RecordingOverlay::new();
        let probe = overlay.probe();
        let lifecycle = AnchorLifecycle::new(Box::new(provider), Box::new(overlay));
        (lifecycle, control, registry, probe)
    }

    fn at(y: f64) -> Pose {
        Pose::from_position(Vector3::new(0.0, y, 1.0))
    }

    #[test]
    fn test_first_reconcile_spawns_then_moves() {
        let (mut lc, control, _registry, probe) = manual();

        lc.reconcile(at(0.0));
        lc.reconcile(at(-0.5));

        assert_eq!(probe.spawn_count(), 1);
        assert_eq!(
            probe.commands(),
            vec![OverlayCommand::Spawn(at(0.0)), OverlayCommand::SetWorldPose(at(-0.5))]
        );
        assert_eq!(lc.overlay_pose(), Some(at(-0.5)));
        assert_eq!(control.request_count(), 2);
        assert_eq!(control.pose(1), Some(at(-0.5)));
        assert_eq!(lc.in_flight_count(), 2);
        assert_eq!(lc.in_flight_pose(ReconcileTicket(1)), Some(at(0.0)));
    }

    #[test]
    fn test_success_adopts_and_replaces_old_anchor() {
        let (mut lc, control, registry, probe) = manual();

        let t1 = lc.reconcile(at(0.0));
        let a1 = control.succeed(0).unwrap();
        assert_eq!(
            lc.poll_completions(),
            vec![(t1, CompletionOutcome::Adopted { anchor: a1, replaced: None })]
        );

        let t2 = lc.reconcile(at(-0.9));
        // Old anchor survives while the new create is in flight.
        assert_eq!(registry.live(), vec![a1]);

        let a2 = control.succeed(1).unwrap();
        assert_eq!(
            lc.poll_completions(),
            vec![(t2, CompletionOutcome::Adopted { anchor: a2, replaced: Some(a1) })]
        );

        assert_eq!(registry.live(), vec![a2]);
        assert_eq!(lc.current_anchor(), Some(a2));
        assert_eq!(probe.parent(), Some(a2));
        assert_eq!(
            probe.commands().last(),
            Some(&OverlayCommand::SetParent { anchor: a2, preserve_world_pose: true })
        );
        assert!(lc.is_settled());
    }

    #[test]
    fn test_failure_keeps_previous_anchor() {
        let (mut lc, control, registry, probe) = manual();

        lc.reconcile(at(0.0));
        let a1 = control.succeed(0).unwrap();
        lc.poll_completions();

        let t2 = lc.reconcile(at(-0.9));
        control.fail(1, AnchorError::InsufficientTracking);
        assert_eq!(
            lc.poll_completions(),
            vec![(t2, CompletionOutcome::Failed(AnchorError::InsufficientTracking))]
        );

        assert_eq!(registry.live(), vec![a1]);
        assert_eq!(lc.current_anchor(), Some(a1));
        // The synchronous move still happened.
        assert_eq!(probe.world_pose(), Some(at(-0.9)));
        assert_eq!(lc.stats().failed, 1);
    }

    #[test]
    fn test_failure_without_previous_anchor_leaves_none() {
        let (mut lc, control, registry, _probe) = manual();
        lc.reconcile(at(0.0));
        control.fail(0, AnchorError::Rejected("no".into()));
        lc.poll_completions();

        assert_eq!(lc.current_anchor(), None);
        assert_eq!(registry.live_count(), 0);
        assert!(lc.overlay().is_some());
    }

    #[test]
    fn test_newer_completes_first_older_is_discarded() {
        let (mut lc, control, registry, probe) = manual();

        let t1 = lc.reconcile(at(0.0));
        let t2 = lc.reconcile(at(-0.9));

        let a2 = control.succeed(1).unwrap();
        assert_eq!(
            lc.poll_completions(),
            vec![(t2, CompletionOutcome::Adopted { anchor: a2, replaced: None })]
        );

        let a1 = control.succeed(0).unwrap();
        assert_eq!(
            lc.poll_completions(),
            vec![(t1, CompletionOutcome::Superseded { anchor: a1 })]
        );

        assert_eq!(registry.live(), vec![a2]);
        assert_eq!(registry.destroyed(), vec![a1]);
        assert_eq!(lc.current_anchor(), Some(a2));
        assert_eq!(probe.parent(), Some(a2));
        assert_eq!(lc.stats().superseded, 1);
    }

    #[test]
    fn test_older_completes_first_then_newer_replaces() {
        let (mut lc, control, registry, _probe) = manual();

        lc.reconcile(at(0.0));
        lc.reconcile(at(-0.9));

        let a1 = control.succeed(0).unwrap();
        lc.poll_completions();
        assert_eq!(lc.current_anchor(), Some(a1));

        let a2 = control.succeed(1).unwrap();
        lc.poll_completions();
        assert_eq!(lc.current_anchor(), Some(a2));
        assert_eq!(registry.live(), vec![a2]);
    }

    #[test]
    fn test_both_resolved_before_poll_applies_in_order() {
        let (mut lc, control, registry, _probe) = manual();

        let t1 = lc.reconcile(at(0.0));
        let t2 = lc.reconcile(at(-0.9));
        let a2 = control.succeed(1).unwrap();
        let a1 = control.succeed(0).unwrap();

        let outcomes = lc.poll_completions();
        assert_eq!(
            outcomes,
            vec![
                (t1, CompletionOutcome::Adopted { anchor: a1, replaced: None }),
                (t2, CompletionOutcome::Adopted { anchor: a2, replaced: Some(a1) }),
            ]
        );
        assert_eq!(registry.live(), vec![a2]);
    }

    #[test]
    fn test_abandoned_request_counts_as_failure() {
        let (mut lc, control, _registry, _probe) = manual();
        let t1 = lc.reconcile(at(0.0));
        control.abandon(0);

        assert_eq!(
            lc.poll_completions(),
            vec![(t1, CompletionOutcome::Failed(AnchorError::Abandoned))]
        );
    }

    #[test]
    fn test_unknown_ticket_ignored() {
        let (mut lc, _control, _registry, _probe) = manual();
        assert_eq!(
            lc.complete(ReconcileTicket(99), Ok(AnchorHandle(1))),
            CompletionOutcome::Unknown
        );
    }

    #[test]
    fn test_settle_with_threaded_provider() {
        let registry = AnchorRegistry::new();
        let provider = SimAnchorProvider::new(registry.clone(), Duration::from_millis(2))
            .with_jitter(Duration::from_millis(5), 9)
            .with_failures([3]);
        let overlay = RecordingOverlay::new();
        let probe = overlay.probe();
        let mut lc = AnchorLifecycle::new(Box::new(provider), Box::new(overlay));

        for i in 0..6 {
            lc.reconcile(at(-0.1 * i as f64));
        }
        assert_eq!(lc.settle(Duration::from_secs(5)), 0);

        let stats = lc.stats();
        assert_eq!(stats.reconciles, 6);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.adopted + stats.superseded, 5);
        assert_eq!(registry.live_count(), 1);
        assert_eq!(registry.invalid_destroys(), 0);
        assert_eq!(probe.parent(), lc.current_anchor());
    }

    #[test]
    fn test_request_outliving_lifecycle_is_released() {
        let registry = AnchorRegistry::new();
        let provider = SimAnchorProvider::new(registry.clone(), Duration::from_millis(50));
        let mut lc = AnchorLifecycle::new(Box::new(provider), Box::new(RecordingOverlay::new()));

        lc.reconcile(at(0.0));
        assert_eq!(lc.settle(Duration::from_millis(1)), 1);
        drop(lc);

        let deadline = Instant::now() + Duration::from_secs(5);
        while registry.destroyed().is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(registry.created_count(), 1);
        assert_eq!(registry.destroyed().len(), 1);
        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.invalid_destroys(), 0);
    }
}
