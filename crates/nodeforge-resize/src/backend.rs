//! Infra backend adapter contract.
//!
//! The conductor never provisions anything itself. It hands a
//! [`DispatchRequest`] to an [`InfraBackend`] and reacts to the verdict.
//! Implementations own retries and timeouts; the conductor treats every
//! `Err` the same way.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use nodeforge_state::{Cluster, NodeGroup, NodeId};

/// One infrastructure change, as handed to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    /// Cluster snapshot taken when the request was accepted.
    pub cluster: Cluster,
    /// Target nodegroup at acceptance, before the count changes.
    pub nodegroup: NodeGroup,
    pub target_node_count: u32,
    /// Nodes to delete on scale-down. Empty means the backend chooses.
    pub nodes_to_remove: Vec<NodeId>,
    /// Whether a failed change should be reverted.
    pub rollback: bool,
}

/// What the backend reports after a successful change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    /// The nodegroup's node ids after the change.
    pub nodes: Vec<NodeId>,
}

/// Failures reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("backend did not answer within {0:?}")]
    Timeout(Duration),

    #[error("backend reported failure: {0}")]
    Failed(String),
}

/// An infrastructure provisioning backend.
#[async_trait]
pub trait InfraBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Bring `request.nodegroup` to `request.target_node_count` nodes.
    async fn resize(&self, request: &DispatchRequest) -> Result<ProvisionReport, BackendError>;

    /// Revert a change that `resize` failed part-way through.
    async fn rollback(&self, request: &DispatchRequest) -> Result<(), BackendError>;
}

#[async_trait]
impl<B: InfraBackend + ?Sized> InfraBackend for Arc<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn resize(&self, request: &DispatchRequest) -> Result<ProvisionReport, BackendError> {
        (**self).resize(request).await
    }

    async fn rollback(&self, request: &DispatchRequest) -> Result<(), BackendError> {
        (**self).rollback(request).await
    }
}

/// Wraps a backend so calls that run past `timeout` fail with
/// [`BackendError::Timeout`].
pub struct TimeoutBackend<B> {
    inner: B,
    timeout: Duration,
}

impl<B: InfraBackend> TimeoutBackend<B> {
    pub fn new(inner: B, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl<B: InfraBackend> InfraBackend for TimeoutBackend<B> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn resize(&self, request: &DispatchRequest) -> Result<ProvisionReport, BackendError> {
        match tokio::time::timeout(self.timeout, self.inner.resize(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    backend = self.inner.name(),
                    cluster_id = %request.cluster.id,
                    timeout = ?self.timeout,
                    "backend resize timed out"
                );
                Err(BackendError::Timeout(self.timeout))
            }
        }
    }

    async fn rollback(&self, request: &DispatchRequest) -> Result<(), BackendError> {
        match tokio::time::timeout(self.timeout, self.inner.rollback(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    backend = self.inner.name(),
                    cluster_id = %request.cluster.id,
                    timeout = ?self.timeout,
                    "backend rollback timed out"
                );
                Err(BackendError::Timeout(self.timeout))
            }
        }
    }
}
