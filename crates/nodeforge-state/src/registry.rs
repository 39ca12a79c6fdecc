//! NodeGroupRegistry — read-only view of one cluster's nodegroups.

use crate::types::*;

/// The nodegroups of a single cluster, ordered by name.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeGroupRegistry {
    cluster_id: ClusterId,
    nodegroups: Vec<NodeGroup>,
}

impl NodeGroupRegistry {
    /// Build a registry, discarding groups owned by other clusters.
    pub fn new(cluster_id: &str, nodegroups: Vec<NodeGroup>) -> Self {
        let mut nodegroups: Vec<NodeGroup> = nodegroups
            .into_iter()
            .filter(|ng| ng.cluster_id == cluster_id)
            .collect();
        nodegroups.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            cluster_id: cluster_id.to_string(),
            nodegroups,
        }
    }

    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    /// Look up a nodegroup by id or name. Ids win over names.
    pub fn get(&self, ident: &str) -> Option<&NodeGroup> {
        self.nodegroups
            .iter()
            .find(|ng| ng.id == ident)
            .or_else(|| self.nodegroups.iter().find(|ng| ng.name == ident))
    }

    /// The default nodegroup for `role`, if the cluster has one.
    pub fn default_for_role(&self, role: NodeGroupRole) -> Option<&NodeGroup> {
        self.nodegroups
            .iter()
            .find(|ng| ng.is_default && ng.role == role)
    }

    /// Cluster-level node count: the sum of all worker groups.
    pub fn worker_node_count(&self) -> u32 {
        self.nodegroups
            .iter()
            .filter(|ng| ng.role == NodeGroupRole::Worker)
            .map(|ng| ng.node_count)
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeGroup> {
        self.nodegroups.iter()
    }

    pub fn len(&self) -> usize {
        self.nodegroups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodegroups.is_empty()
    }

    pub fn into_vec(self) -> Vec<NodeGroup> {
        self.nodegroups
    }
}
