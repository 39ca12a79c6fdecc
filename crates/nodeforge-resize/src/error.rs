//! Resize engine error types.
//!
//! Everything here is a synchronous rejection: the request never reached
//! the backend and no state was mutated. Backend failures are not errors
//! of `resize()`; they surface later as a lifecycle status.

use thiserror::Error;

use nodeforge_state::{LifecycleStatus, NodeGroupRole, NodeId, StateError};

use crate::lifecycle::TransitionError;

/// Reasons a request fails nodegroup policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("nodegroup {nodegroup} ({role}) cannot be resized")]
    InvalidTarget {
        nodegroup: String,
        role: NodeGroupRole,
    },

    #[error("node count {requested} is below the minimum {min} of nodegroup {nodegroup}")]
    BelowMinimum {
        nodegroup: String,
        requested: u32,
        min: u32,
    },

    #[error("node count {requested} is above the maximum {max} of nodegroup {nodegroup}")]
    AboveMaximum {
        nodegroup: String,
        requested: u32,
        max: u32,
    },

    /// The service-wide `max_nodes_per_nodegroup`, independent of the
    /// nodegroup's own bounds.
    #[error("node count {requested} for nodegroup {nodegroup} exceeds the service limit {limit}")]
    AboveServiceLimit {
        nodegroup: String,
        requested: u32,
        limit: u32,
    },
}

/// Reasons the target nodegroup cannot be determined.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("nodegroup {nodegroup} not found in cluster {cluster_id}")]
    NodeGroupNotFound {
        cluster_id: String,
        nodegroup: String,
    },

    #[error("cluster {cluster_id} has no default worker nodegroup")]
    NoDefaultNodeGroup { cluster_id: String },
}

/// Reasons a scale-down removal list is unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("{given} distinct nodes named for removal, but the resize removes {expected}")]
    RemovalCountMismatch { expected: u32, given: usize },

    #[error("node {node} is not a member of nodegroup {nodegroup}")]
    UnknownNode { nodegroup: String, node: NodeId },
}

/// Result type alias for resize operations.
pub type ResizeResult<T> = Result<T, ResizeError>;

/// Errors returned synchronously by `Conductor::resize`.
#[derive(Debug, Error)]
pub enum ResizeError {
    #[error("cluster not found: {0}")]
    ClusterNotFound(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("cluster {cluster_id} already has an operation in progress")]
    ConflictInProgress { cluster_id: String },

    #[error("cluster {cluster_id} is in status {status} and cannot be resized")]
    InvalidState {
        cluster_id: String,
        status: LifecycleStatus,
    },

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("state store error: {0}")]
    State(#[from] StateError),

    #[error("resize task failed: {0}")]
    TaskFailed(String),
}

impl ResizeError {
    /// Stable, machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ClusterNotFound(_) => "ClusterNotFound",
            Self::Validation(ValidationError::InvalidTarget { .. }) => "InvalidTarget",
            Self::Validation(ValidationError::BelowMinimum { .. }) => "BelowMinimum",
            Self::Validation(ValidationError::AboveMaximum { .. }) => "AboveMaximum",
            Self::Validation(ValidationError::AboveServiceLimit { .. }) => "AboveServiceLimit",
            Self::Resolve(ResolveError::NodeGroupNotFound { .. }) => "NodeGroupNotFound",
            Self::Resolve(ResolveError::NoDefaultNodeGroup { .. }) => "NoDefaultNodeGroup",
            Self::Plan(PlanError::RemovalCountMismatch { .. }) => "RemovalCountMismatch",
            Self::Plan(PlanError::UnknownNode { .. }) => "UnknownNode",
            Self::ConflictInProgress { .. } => "ConflictInProgress",
            Self::InvalidState { .. } => "InvalidState",
            Self::Transition(_) => "IllegalTransition",
            Self::State(_) => "StateError",
            Self::TaskFailed(_) => "TaskFailed",
        }
    }

    /// True when the caller can fix the problem by changing the request
    /// (or waiting for the in-flight operation).
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::Transition(_) | Self::State(_) | Self::TaskFailed(_)
        )
    }
}
