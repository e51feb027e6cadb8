//! Anchor handles, failures and the one-shot task returned by anchor creation.

use std::fmt;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded};
use thiserror::Error;

/// Opaque provider handle to a live spatial anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnchorHandle(pub u64);

impl fmt::Display for AnchorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A{}", self.0)
    }
}

/// Why an anchor could not be created. All variants are transient.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnchorError {
    #[error("anchor provider rejected the request: {0}")]
    Rejected(String),
    #[error("insufficient tracking to place an anchor")]
    InsufficientTracking,
    #[error("anchor request abandoned before it resolved")]
    Abandoned,
}

pub type AnchorResult = Result<AnchorHandle, AnchorError>;

/// Pending `create_anchor` call.
///
/// Resolves exactly once. If the provider drops its `AnchorResolver` without
/// resolving, the task resolves to `AnchorError::Abandoned`.
#[derive(Debug)]
pub struct PendingAnchor {
    rx: Receiver<AnchorResult>,
}

/// Provider side of a `PendingAnchor`.
#[derive(Debug)]
pub struct AnchorResolver {
    tx: Sender<AnchorResult>,
}

impl PendingAnchor {
    /// Linked resolver/task pair.
    pub fn channel() -> (AnchorResolver, PendingAnchor) {
        let (tx, rx) = bounded(1);
        (AnchorResolver { tx }, PendingAnchor { rx })
    }

    /// A task that is already resolved.
    pub fn ready(result: AnchorResult) -> PendingAnchor {
        let (resolver, pending) = Self::channel();
        // Cannot fail: `pending` is still alive.
        let _ = resolver.resolve(result);
        pending
    }

    /// Non-blocking check.
    pub fn try_resolve(&self) -> Option<AnchorResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(AnchorError::Abandoned)),
        }
    }

    /// Block up to `timeout` for the result.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<AnchorResult> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(AnchorError::Abandoned)),
        }
    }

    /// Underlying receiver, for multiplexing with `crossbeam_channel::Select`.
    pub fn receiver(&self) -> &Receiver<AnchorResult> {
        &self.rx
    }
}

impl AnchorResolver {
    /// Complete the task.
    ///
    /// Hands the result back if the `PendingAnchor` was dropped, so a provider
    /// can release an anchor nobody will adopt.
    pub fn resolve(self, result: AnchorResult) -> Result<(), AnchorResult> {
        self.tx.send(result).map_err(|err| err.into_inner())
    }
}
