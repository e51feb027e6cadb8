//! Session orchestration: the Observation Router, its configuration and the
//! thread that runs it.
//!
//! `ReconcileSystem` spawns one router thread per session. The router owns
//! every piece of mutable state; the host reads `SessionStatus` snapshots
//! through `SharedState`.

pub mod config;
pub mod error;
pub mod messages;
pub mod router;
pub mod shared_state;
mod reconcile_system;

pub use config::AnchorConfig;
pub use error::SetupError;
pub use messages::RouterEvent;
pub use reconcile_system::ReconcileSystem;
pub use router::{Collaborators, ObservationRouter};
pub use shared_state::{SessionStatus, SharedState};
