//! Wake-up events multiplexed by the router thread.

use crate::anchor::{AnchorResult, ReconcileTicket};
use crate::tracking::{MarkerChanges, PlaneChanges};

/// One unit of work for the router, in the order it was received.
#[derive(Debug)]
pub enum RouterEvent {
    /// Batch from the marker tracking provider.
    Markers(MarkerChanges),
    /// Batch from the plane tracking provider.
    Planes(PlaneChanges),
    /// An outstanding anchor request resolved.
    Anchor(ReconcileTicket, AnchorResult),
}
