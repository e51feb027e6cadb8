//! Observation data model for the two tracking providers.
//!
//! - Image markers (`MarkerObservation`) give the initial absolute pose.
//! - Horizontal planes (`PlaneObservation`) refine the overlay height.
//!
//! Both arrive as batched `ChangeSet`s through an `EventFeed`.

pub mod changes;
pub mod feed;
pub mod marker;
pub mod plane;
pub mod state;

pub use changes::{ChangeSet, Trackable};
pub use feed::{EventFeed, Subscription, SubscriptionId};
pub use marker::{MarkerId, MarkerObservation};
pub use plane::{PlaneAlignment, PlaneId, PlaneObservation};
pub use state::TrackingState;

/// Marker change batch.
pub type MarkerChanges = ChangeSet<MarkerObservation>;

/// Plane change batch.
pub type PlaneChanges = ChangeSet<PlaneObservation>;
