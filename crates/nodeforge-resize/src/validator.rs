//! Request validation against nodegroup policy.

use nodeforge_state::{Cluster, NodeGroup};

use crate::config::ResizeConfig;
use crate::error::ValidationError;

/// Checks a requested node count against a nodegroup's role and bounds.
///
/// Pure: no I/O, no logging, same answer for the same inputs.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    ceiling: Option<u32>,
}

impl Validator {
    pub fn new(config: &ResizeConfig) -> Self {
        Self {
            ceiling: config.max_nodes_per_nodegroup,
        }
    }

    /// Validate a resize of `nodegroup` (owned by `cluster`) to `requested` nodes.
    ///
    /// Checks run in order and stop at the first failure:
    /// 1. the group belongs to the cluster and is not a control-plane group,
    /// 2. `requested >= min_node_count`,
    /// 3. `requested <= max_node_count` when a maximum is configured,
    /// 4. `requested <=` the engine-wide ceiling when one is configured
    ///    (`AboveServiceLimit`, never `AboveMaximum`).
    pub fn validate(
        &self,
        cluster: &Cluster,
        nodegroup: &NodeGroup,
        requested: u32,
    ) -> Result<(), ValidationError> {
        if nodegroup.cluster_id != cluster.id || nodegroup.role.is_control_plane() {
            return Err(ValidationError::InvalidTarget {
                nodegroup: nodegroup.name.clone(),
                role: nodegroup.role,
            });
        }

        if requested < nodegroup.min_node_count {
            return Err(ValidationError::BelowMinimum {
                nodegroup: nodegroup.name.clone(),
                requested,
                min: nodegroup.min_node_count,
            });
        }

        // No configured maximum means no upper check at all.
        if let Some(max) = nodegroup.max_node_count
            && requested > max
        {
            return Err(ValidationError::AboveMaximum {
                nodegroup: nodegroup.name.clone(),
                requested,
                max,
            });
        }

        if let Some(limit) = self.ceiling
            && requested > limit
        {
            return Err(ValidationError::AboveServiceLimit {
                nodegroup: nodegroup.name.clone(),
                requested,
                limit,
            });
        }

        Ok(())
    }
}
