//! Conductor — accepts resize requests and drives them to completion.
//!
//! `resize()` runs the synchronous prefix (resolve, validate, plan, lease,
//! status transition) on the caller's task and returns as soon as the
//! backend operation is spawned. The spawned task calls the backend,
//! optionally rolls back, then applies the completion to the state store
//! and releases the cluster lease.

use std::sync::Arc;

use tracing::{error, info, warn};

use nodeforge_state::{
    Cluster, LifecycleStatus, NodeGroup, NodeGroupRegistry, StateError, StateStore,
};

use crate::backend::{BackendError, DispatchRequest, InfraBackend, ProvisionReport};
use crate::config::ResizeConfig;
use crate::error::{ResizeError, ResizeResult};
use crate::lease::ClusterLeases;
use crate::lifecycle::{self, LifecycleEvent};
use crate::planner;
use crate::request::{Accepted, CompletionReport, ScalingOutcome, ScalingRequest};
use crate::resolver;
use crate::validator::Validator;

/// The scaling orchestrator. Cheap to clone; clones share leases.
#[derive(Clone)]
pub struct Conductor {
    inner: Arc<Inner>,
}

struct Inner {
    state: StateStore,
    backend: Arc<dyn InfraBackend>,
    validator: Validator,
    leases: ClusterLeases,
}

/// What the backend (and, if asked, the rollback) ended up doing.
enum Verdict {
    Succeeded(ProvisionReport),
    Failed(BackendError),
    RolledBack(BackendError),
    RollbackFailed {
        failure: BackendError,
        rollback: BackendError,
    },
}

impl Verdict {
    fn event(&self) -> LifecycleEvent {
        match self {
            Self::Succeeded(_) => LifecycleEvent::BackendSucceeded,
            Self::Failed(_) => LifecycleEvent::BackendFailed,
            Self::RolledBack(_) => LifecycleEvent::RollbackSucceeded,
            Self::RollbackFailed { .. } => LifecycleEvent::RollbackFailed,
        }
    }

    fn reason(&self) -> Option<String> {
        match self {
            Self::Succeeded(_) => None,
            Self::Failed(e) => Some(e.to_string()),
            Self::RolledBack(e) => Some(format!("rolled back after: {e}")),
            Self::RollbackFailed { failure, rollback } => {
                Some(format!("rollback failed: {rollback} (after: {failure})"))
            }
        }
    }
}

impl Conductor {
    /// Create a conductor over `state` that dispatches to `backend`.
    pub fn new(state: StateStore, backend: Arc<dyn InfraBackend>, config: &ResizeConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                state,
                backend,
                validator: Validator::new(config),
                leases: ClusterLeases::new(),
            }),
        }
    }

    pub fn state(&self) -> &StateStore {
        &self.inner.state
    }

    /// True while an accepted operation on `cluster_id` has not completed.
    pub fn is_busy(&self, cluster_id: &str) -> bool {
        self.inner.leases.is_held(cluster_id)
    }

    /// Accept a resize of one nodegroup of `cluster_id`.
    ///
    /// Returns once the operation is dispatched; the result carries the
    /// pre-completion snapshot. Must be called from within a Tokio runtime.
    pub fn resize(&self, cluster_id: &str, request: ScalingRequest) -> ResizeResult<Accepted> {
        let inner = &self.inner;

        // Read-only checks first: a bad request is rejected without touching
        // the lease, the store, or the backend.
        {
            let (cluster, registry) = inner.load(cluster_id)?;
            let nodegroup = resolver::resolve(&registry, request.nodegroup.as_deref())
                .inspect_err(|e| warn!(%cluster_id, error = %e, "resize rejected"))?;
            inner
                .validator
                .validate(&cluster, nodegroup, request.node_count)
                .inspect_err(|e| warn!(%cluster_id, error = %e, "resize rejected"))?;
            planner::plan(nodegroup, request.node_count, request.nodes_to_remove.as_deref())
                .inspect_err(|e| warn!(%cluster_id, error = %e, "resize rejected"))?;
        }

        let Some(lease) = inner.leases.try_acquire(cluster_id) else {
            warn!(%cluster_id, "resize rejected: operation already in flight");
            return Err(ResizeError::ConflictInProgress {
                cluster_id: cluster_id.to_string(),
            });
        };

        // Re-read under the lease: a completion may have landed between the
        // first read and the acquire.
        let (mut cluster, registry) = inner.load(cluster_id)?;
        match cluster.status {
            LifecycleStatus::Stable => {}
            LifecycleStatus::UpdateInProgress => {
                warn!(%cluster_id, "resize rejected: cluster persisted as update_in_progress");
                return Err(ResizeError::ConflictInProgress {
                    cluster_id: cluster_id.to_string(),
                });
            }
            status => {
                warn!(%cluster_id, %status, "resize rejected: cluster needs operator action");
                return Err(ResizeError::InvalidState {
                    cluster_id: cluster_id.to_string(),
                    status,
                });
            }
        }

        let mut nodegroup = resolver::resolve(&registry, request.nodegroup.as_deref())?.clone();
        inner
            .validator
            .validate(&cluster, &nodegroup, request.node_count)?;
        let plan = planner::plan(
            &nodegroup,
            request.node_count,
            request.nodes_to_remove.as_deref(),
        )?;

        lifecycle::transition(&mut cluster, LifecycleEvent::ResizeAccepted, None)?;
        lifecycle::transition(&mut nodegroup, LifecycleEvent::ResizeAccepted, None)?;
        inner.state.put_cluster_and_nodegroup(&cluster, &nodegroup)?;

        info!(
            %cluster_id,
            nodegroup = %nodegroup.name,
            from = nodegroup.node_count,
            to = plan.target_node_count,
            direction = ?plan.direction,
            rollback = request.rollback,
            backend = inner.backend.name(),
            "resize accepted"
        );

        let outcome = ScalingOutcome::snapshot(&cluster, &registry);
        let dispatch = DispatchRequest {
            cluster,
            nodegroup,
            target_node_count: plan.target_node_count,
            nodes_to_remove: plan.nodes_to_remove.clone(),
            rollback: request.rollback,
        };

        let task_inner = Arc::clone(&self.inner);
        let operation = tokio::spawn(async move {
            let report = task_inner.execute(dispatch).await;
            drop(lease);
            report
        });

        Ok(Accepted {
            outcome,
            plan,
            operation,
        })
    }
}

impl Inner {
    fn load(&self, cluster_id: &str) -> ResizeResult<(Cluster, NodeGroupRegistry)> {
        let cluster = self
            .state
            .get_cluster(cluster_id)?
            .ok_or_else(|| ResizeError::ClusterNotFound(cluster_id.to_string()))?;
        let registry = self.state.load_registry(cluster_id)?;
        Ok((cluster, registry))
    }

    /// Run the backend operation and apply its outcome.
    async fn execute(&self, request: DispatchRequest) -> CompletionReport {
        let cluster_id = request.cluster.id.as_str();

        let verdict = match self.backend.resize(&request).await {
            Ok(report) => Verdict::Succeeded(report),
            Err(failure) if request.rollback => {
                warn!(%cluster_id, error = %failure, "backend resize failed, rolling back");
                match self.backend.rollback(&request).await {
                    Ok(()) => Verdict::RolledBack(failure),
                    Err(rollback) => Verdict::RollbackFailed { failure, rollback },
                }
            }
            Err(failure) => Verdict::Failed(failure),
        };

        match &verdict {
            Verdict::Succeeded(_) => info!(
                %cluster_id,
                nodegroup = %request.nodegroup.name,
                node_count = request.target_node_count,
                "resize completed"
            ),
            Verdict::Failed(e) => error!(%cluster_id, error = %e, "resize failed"),
            Verdict::RolledBack(e) => warn!(%cluster_id, error = %e, "resize rolled back"),
            Verdict::RollbackFailed { failure, rollback } => error!(
                %cluster_id,
                error = %failure,
                rollback_error = %rollback,
                "rollback failed; operator intervention required"
            ),
        }

        match self.apply_completion(&request, &verdict) {
            Ok((cluster, nodegroup)) => CompletionReport {
                cluster_id: cluster.id,
                nodegroup_id: nodegroup.id,
                status: cluster.status,
                node_count: nodegroup.node_count,
                failure: verdict.reason(),
            },
            Err(e) => {
                // Nothing was written, so the store keeps whatever the
                // acceptance (or a concurrent writer) left behind.
                let outcome = verdict.reason();
                error!(
                    %cluster_id,
                    nodegroup = %request.nodegroup.name,
                    error = %e,
                    outcome = outcome.as_deref().unwrap_or("succeeded"),
                    "failed to record resize completion; cluster stays update_in_progress \
                     and refuses resizes until an operator resets its status"
                );
                CompletionReport {
                    cluster_id: request.cluster.id.clone(),
                    nodegroup_id: request.nodegroup.id.clone(),
                    status: request.cluster.status,
                    node_count: request.nodegroup.node_count,
                    failure: Some(e.to_string()),
                }
            }
        }
    }

    /// Fold the verdict into the persisted cluster and nodegroup.
    ///
    /// `node_count` only changes on confirmed success.
    fn apply_completion(
        &self,
        request: &DispatchRequest,
        verdict: &Verdict,
    ) -> ResizeResult<(Cluster, NodeGroup)> {
        let cluster_id = request.cluster.id.as_str();
        let (mut cluster, registry) = self.load(cluster_id)?;
        let mut nodegroup = registry
            .get(&request.nodegroup.id)
            .cloned()
            .ok_or_else(|| StateError::NotFound(format!("nodegroup {}", request.nodegroup.id)))?;

        if let Verdict::Succeeded(report) = verdict {
            if report.nodes.len() != request.target_node_count as usize {
                warn!(
                    %cluster_id,
                    nodegroup = %nodegroup.name,
                    reported = report.nodes.len(),
                    expected = request.target_node_count,
                    "backend reported a different number of nodes than requested"
                );
            }
            nodegroup.node_count = request.target_node_count;
            nodegroup.nodes = report.nodes.clone();
        }

        let event = verdict.event();
        lifecycle::transition(&mut cluster, event, verdict.reason())?;
        lifecycle::transition(&mut nodegroup, event, verdict.reason())?;
        self.state.put_cluster_and_nodegroup(&cluster, &nodegroup)?;
        Ok((cluster, nodegroup))
    }
}
