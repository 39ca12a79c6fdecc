//! In-process backend that pretends to provision nodes.
//!
//! Used by `nodeforged` when no real infrastructure is wired in, and by
//! tests that want realistic node bookkeeping without a fake.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use nodeforge_state::NodeId;

use crate::backend::{BackendError, DispatchRequest, InfraBackend, ProvisionReport};

#[derive(Debug, Clone, Default)]
pub struct SimulatedConfig {
    /// How long each resize or rollback takes.
    pub delay: Duration,
    /// Report every resize as failed.
    pub fail_resizes: bool,
    /// Report every rollback as failed.
    pub fail_rollbacks: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedBackend {
    config: SimulatedConfig,
}

impl SimulatedBackend {
    pub fn new(config: SimulatedConfig) -> Self {
        Self { config }
    }

    /// Node list after the change: named removals first, then the newest
    /// nodes, then freshly named nodes for a scale-up.
    fn provision(request: &DispatchRequest) -> Vec<NodeId> {
        let target = request.target_node_count as usize;
        let mut nodes: Vec<NodeId> = request
            .nodegroup
            .nodes
            .iter()
            .filter(|n| !request.nodes_to_remove.contains(*n))
            .cloned()
            .collect();
        nodes.truncate(target);
        while nodes.len() < target {
            let suffix = Uuid::new_v4().simple().to_string();
            nodes.push(format!("{}-node-{}", request.nodegroup.name, &suffix[..8]));
        }
        nodes
    }
}

#[async_trait]
impl InfraBackend for SimulatedBackend {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn resize(&self, request: &DispatchRequest) -> Result<ProvisionReport, BackendError> {
        debug!(
            cluster_id = %request.cluster.id,
            nodegroup = %request.nodegroup.name,
            target = request.target_node_count,
            delay = ?self.config.delay,
            "simulating resize"
        );
        tokio::time::sleep(self.config.delay).await;

        if self.config.fail_resizes {
            return Err(BackendError::Failed(format!(
                "simulated failure resizing {}",
                request.nodegroup.name
            )));
        }

        let nodes = Self::provision(request);
        info!(
            cluster_id = %request.cluster.id,
            nodegroup = %request.nodegroup.name,
            nodes = nodes.len(),
            "simulated resize finished"
        );
        Ok(ProvisionReport { nodes })
    }

    async fn rollback(&self, request: &DispatchRequest) -> Result<(), BackendError> {
        tokio::time::sleep(self.config.delay).await;
        if self.config.fail_rollbacks {
            return Err(BackendError::Failed(format!(
                "simulated failure rolling back {}",
                request.nodegroup.name
            )));
        }
        info!(cluster_id = %request.cluster.id, "simulated rollback finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodeforge_state::{Cluster, NodeGroup, NodeGroupRole};

    fn request(count: u32, target: u32, remove: &[&str]) -> DispatchRequest {
        let cluster = Cluster::new("c", "t");
        let nodegroup = NodeGroup::new(&cluster.id, "workers", NodeGroupRole::Worker, count);
        DispatchRequest {
            cluster,
            nodegroup,
            target_node_count: target,
            nodes_to_remove: remove.iter().map(|n| n.to_string()).collect(),
            rollback: false,
        }
    }

    #[tokio::test]
    async fn scale_up_names_new_nodes() {
        let backend = SimulatedBackend::default();
        let report = backend.resize(&request(2, 4, &[])).await.unwrap();
        assert_eq!(report.nodes.len(), 4);
        assert_eq!(&report.nodes[..2], ["workers-node-0", "workers-node-1"]);
        for node in &report.nodes[2..] {
            assert!(node.starts_with("workers-node-"));
            assert_eq!(node.len(), "workers-node-".len() + 8);
        }
        assert_ne!(report.nodes[2], report.nodes[3]);
    }

    #[tokio::test]
    async fn scale_down_drops_newest_by_default() {
        let backend = SimulatedBackend::default();
        let report = backend.resize(&request(4, 2, &[])).await.unwrap();
        assert_eq!(report.nodes, vec!["workers-node-0", "workers-node-1"]);
    }

    #[tokio::test]
    async fn scale_down_honours_named_nodes() {
        let backend = SimulatedBackend::default();
        let report = backend
            .resize(&request(4, 2, &["workers-node-0", "workers-node-2"]))
            .await
            .unwrap();
        assert_eq!(report.nodes, vec!["workers-node-1", "workers-node-3"]);
    }

    #[tokio::test]
    async fn configured_failures() {
        let backend = SimulatedBackend::new(SimulatedConfig {
            fail_resizes: true,
            fail_rollbacks: true,
            ..SimulatedConfig::default()
        });
        let req = request(1, 2, &[]);
        assert!(matches!(backend.resize(&req).await, Err(BackendError::Failed(_))));
        assert!(matches!(backend.rollback(&req).await, Err(BackendError::Failed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn delay_is_observed() {
        let backend = SimulatedBackend::new(SimulatedConfig {
            delay: Duration::from_secs(5),
            ..SimulatedConfig::default()
        });
        let started = tokio::time::Instant::now();
        backend.rollback(&request(1, 1, &[])).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(5));
    }
}
