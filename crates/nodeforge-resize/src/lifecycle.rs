//! Lifecycle state machine for clusters and nodegroups.
//!
//! ```text
//!            ResizeAccepted
//!   stable ─────────────────► update_in_progress
//!     ▲                          │   │   │
//!     │ BackendSucceeded         │   │   │ BackendFailed
//!     │ RollbackSucceeded        │   │   └──────────────► error            (terminal)
//!     └──────────────────────────┘   │ RollbackFailed
//!                                    └──────────────────► rollback_failed  (terminal)
//! ```
//!
//! Terminal states have no outgoing transitions; leaving them is an
//! operator action outside the engine.

use thiserror::Error;
use tracing::debug;

use nodeforge_state::{Cluster, LifecycleStatus, NodeGroup, epoch_secs};

/// Something that happened to an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    ResizeAccepted,
    BackendSucceeded,
    BackendFailed,
    RollbackSucceeded,
    RollbackFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal lifecycle transition from {from} on {event:?}")]
pub struct TransitionError {
    pub from: LifecycleStatus,
    pub event: LifecycleEvent,
}

/// The status reached from `from` on `event`, if the transition is legal.
pub fn next_status(
    from: LifecycleStatus,
    event: LifecycleEvent,
) -> Result<LifecycleStatus, TransitionError> {
    use self::LifecycleEvent as E;
    use nodeforge_state::LifecycleStatus as S;

    match (from, event) {
        (S::Stable, E::ResizeAccepted) => Ok(S::UpdateInProgress),
        (S::UpdateInProgress, E::BackendSucceeded | E::RollbackSucceeded) => Ok(S::Stable),
        (S::UpdateInProgress, E::BackendFailed) => Ok(S::Error),
        (S::UpdateInProgress, E::RollbackFailed) => Ok(S::RollbackFailed),
        _ => Err(TransitionError { from, event }),
    }
}

/// Anything that carries a lifecycle status.
pub trait Lifecycle {
    fn status(&self) -> LifecycleStatus;
    fn set_status(&mut self, status: LifecycleStatus, reason: Option<String>);
}

impl Lifecycle for Cluster {
    fn status(&self) -> LifecycleStatus {
        self.status
    }

    fn set_status(&mut self, status: LifecycleStatus, reason: Option<String>) {
        self.status = status;
        self.status_reason = reason;
        self.updated_at = epoch_secs();
    }
}

impl Lifecycle for NodeGroup {
    fn status(&self) -> LifecycleStatus {
        self.status
    }

    fn set_status(&mut self, status: LifecycleStatus, _reason: Option<String>) {
        self.status = status;
        self.updated_at = epoch_secs();
    }
}

/// Apply `event` to `subject`, leaving it untouched on an illegal transition.
pub fn transition<T: Lifecycle>(
    subject: &mut T,
    event: LifecycleEvent,
    reason: Option<String>,
) -> Result<LifecycleStatus, TransitionError> {
    let from = subject.status();
    let to = next_status(from, event)?;
    subject.set_status(to, reason);
    debug!(%from, %to, ?event, "lifecycle transition");
    Ok(to)
}
