//! Domain types for the nodeforge state store.
//!
//! These types represent the persisted state of clusters and their
//! nodegroups. All types are serializable to/from JSON for storage in
//! redb tables.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Unique identifier for a cluster.
pub type ClusterId = String;

/// Unique identifier for a nodegroup (unique within its cluster).
pub type NodeGroupId = String;

/// Identifier of a provisioned node instance.
pub type NodeId = String;

// ── Lifecycle ─────────────────────────────────────────────────────

/// Lifecycle status shared by clusters and nodegroups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    /// No operation in flight; the recorded counts match the infrastructure.
    Stable,
    /// A resize has been accepted and the backend is working on it.
    UpdateInProgress,
    /// The backend failed and no rollback was requested.
    Error,
    /// The backend failed and the compensating rollback failed too.
    RollbackFailed,
}

impl LifecycleStatus {
    /// Terminal states can only be left through operator action.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Error | Self::RollbackFailed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::UpdateInProgress => "update_in_progress",
            Self::Error => "error",
            Self::RollbackFailed => "rollback_failed",
        }
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Cluster ───────────────────────────────────────────────────────

/// A provisioned cluster. Its nodegroups are stored separately.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cluster {
    pub id: ClusterId,
    pub name: String,
    /// The template this cluster was instantiated from.
    pub cluster_template_id: String,
    pub status: LifecycleStatus,
    /// Human-readable explanation of the last failure, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_reason: Option<String>,
    /// Unix timestamp (seconds) when the cluster was created.
    pub created_at: u64,
    /// Unix timestamp (seconds) of the last status change.
    pub updated_at: u64,
}

impl Cluster {
    /// Build a new stable cluster with a freshly generated id.
    pub fn new(name: &str, cluster_template_id: &str) -> Self {
        let now = epoch_secs();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            cluster_template_id: cluster_template_id.to_string(),
            status: LifecycleStatus::Stable,
            status_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Build the key for the clusters table.
    pub fn table_key(&self) -> String {
        self.id.clone()
    }
}

// ── NodeGroup ─────────────────────────────────────────────────────

/// Role of the nodes in a nodegroup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeGroupRole {
    #[serde(alias = "control-plane", alias = "control_plane")]
    Master,
    Worker,
}

impl NodeGroupRole {
    pub fn is_control_plane(self) -> bool {
        self == Self::Master
    }
}

impl fmt::Display for NodeGroupRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Master => f.write_str("master"),
            Self::Worker => f.write_str("worker"),
        }
    }
}

/// An independently scalable set of nodes within a cluster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeGroup {
    pub id: NodeGroupId,
    pub name: String,
    /// Owning cluster (back-reference only).
    pub cluster_id: ClusterId,
    pub role: NodeGroupRole,
    pub node_count: u32,
    #[serde(default)]
    pub min_node_count: u32,
    /// `None` means no configured ceiling.
    #[serde(default)]
    pub max_node_count: Option<u32>,
    #[serde(default)]
    pub is_default: bool,
    /// Node instances currently in the group, oldest first.
    #[serde(default)]
    pub nodes: Vec<NodeId>,
    pub status: LifecycleStatus,
    pub created_at: u64,
    pub updated_at: u64,
}

impl NodeGroup {
    /// Build a new stable nodegroup with `node_count` placeholder node ids.
    pub fn new(cluster_id: &str, name: &str, role: NodeGroupRole, node_count: u32) -> Self {
        let now = epoch_secs();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            cluster_id: cluster_id.to_string(),
            role,
            node_count,
            min_node_count: 0,
            max_node_count: None,
            is_default: false,
            nodes: (0..node_count).map(|i| format!("{name}-node-{i}")).collect(),
            status: LifecycleStatus::Stable,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark this group as the cluster's default for its role.
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Build the composite key for the nodegroups table.
    pub fn table_key(&self) -> String {
        format!("{}:{}", self.cluster_id, self.id)
    }

    /// True if `ident` names this group by id or by name.
    pub fn matches(&self, ident: &str) -> bool {
        self.id == ident || self.name == ident
    }

    pub fn has_node(&self, node: &str) -> bool {
        self.nodes.iter().any(|n| n == node)
    }
}

/// Current Unix epoch in seconds.
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
