//! Anchor Lifecycle Manager and the outbound collaborator interfaces.

pub mod lifecycle;
pub mod provider;
pub mod types;

pub use lifecycle::{AnchorLifecycle, CompletionOutcome, LifecycleStats, OverlayState, ReconcileTicket};
pub use provider::{AnchorProvider, OverlayRenderer};
pub use types::{AnchorError, AnchorHandle, AnchorResolver, AnchorResult, PendingAnchor};
