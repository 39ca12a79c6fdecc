//! Request and response shapes of the resize operation.

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use nodeforge_state::{Cluster, LifecycleStatus, NodeGroupRegistry, NodeId};

use crate::error::{ResizeError, ResizeResult};
use crate::planner::ScalingPlan;

/// A request to resize one nodegroup of a cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingRequest {
    pub node_count: u32,
    /// Nodegroup id or name. Absent means the default worker group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodegroup: Option<String>,
    /// Revert the infrastructure change if the backend fails.
    #[serde(default)]
    pub rollback: bool,
    /// Specific nodes to delete on scale-down.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes_to_remove: Option<Vec<NodeId>>,
}

impl ScalingRequest {
    pub fn new(node_count: u32) -> Self {
        Self {
            node_count,
            ..Self::default()
        }
    }

    pub fn nodegroup(mut self, nodegroup: &str) -> Self {
        self.nodegroup = Some(nodegroup.to_string());
        self
    }

    pub fn with_rollback(mut self) -> Self {
        self.rollback = true;
        self
    }

    pub fn removing(mut self, nodes: &[&str]) -> Self {
        self.nodes_to_remove = Some(nodes.iter().map(|n| n.to_string()).collect());
        self
    }
}

/// Cluster snapshot returned to the caller of an accepted request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingOutcome {
    pub uuid: String,
    /// Sum of the worker nodegroups' node counts.
    pub node_count: u32,
    pub cluster_template_id: String,
    pub status: LifecycleStatus,
}

impl ScalingOutcome {
    pub fn snapshot(cluster: &Cluster, registry: &NodeGroupRegistry) -> Self {
        Self {
            uuid: cluster.id.clone(),
            node_count: registry.worker_node_count(),
            cluster_template_id: cluster.cluster_template_id.clone(),
            status: cluster.status,
        }
    }
}

/// How an asynchronous operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReport {
    pub cluster_id: String,
    pub nodegroup_id: String,
    /// Cluster status after the completion was applied.
    pub status: LifecycleStatus,
    /// Nodegroup node count after the completion was applied.
    pub node_count: u32,
    /// Backend (and rollback) failure text, if any.
    pub failure: Option<String>,
}

/// An accepted resize: the snapshot plus a handle on the running operation.
///
/// Dropping it detaches the operation; it still runs to completion.
#[derive(Debug)]
pub struct Accepted {
    pub outcome: ScalingOutcome,
    pub plan: ScalingPlan,
    pub(crate) operation: JoinHandle<CompletionReport>,
}

impl Accepted {
    /// Wait for the backend to finish and the completion to be applied.
    pub async fn wait(self) -> ResizeResult<CompletionReport> {
        self.operation
            .await
            .map_err(|e| ResizeError::TaskFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_request_body() {
        let req: ScalingRequest = serde_json::from_str(r#"{"node_count": 6}"#).unwrap();
        assert_eq!(req, ScalingRequest::new(6));
        assert!(!req.rollback);
        assert!(req.nodegroup.is_none());
    }

    #[test]
    fn full_request_body() {
        let req: ScalingRequest = serde_json::from_str(
            r#"{"node_count": 1, "nodegroup": "ng-1", "rollback": true,
                "nodes_to_remove": ["a", "b"]}"#,
        )
        .unwrap();
        assert_eq!(
            req,
            ScalingRequest::new(1)
                .nodegroup("ng-1")
                .with_rollback()
                .removing(&["a", "b"])
        );
    }

    #[test]
    fn outcome_serializes_boundary_fields() {
        let outcome = ScalingOutcome {
            uuid: "c-1".into(),
            node_count: 3,
            cluster_template_id: "t-1".into(),
            status: LifecycleStatus::UpdateInProgress,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["uuid"], "c-1");
        assert_eq!(json["node_count"], 3);
        assert_eq!(json["cluster_template_id"], "t-1");
        assert_eq!(json["status"], "update_in_progress");
    }
}
