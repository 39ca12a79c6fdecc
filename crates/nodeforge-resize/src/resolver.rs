//! Target nodegroup resolution.

use nodeforge_state::{NodeGroup, NodeGroupRegistry, NodeGroupRole};

use crate::error::ResolveError;

/// Pick the nodegroup a request targets.
///
/// An explicit reference (id or name) must exist in the cluster. Without
/// one, the cluster's default worker nodegroup is used.
pub fn resolve<'a>(
    registry: &'a NodeGroupRegistry,
    explicit: Option<&str>,
) -> Result<&'a NodeGroup, ResolveError> {
    match explicit {
        Some(ident) => registry
            .get(ident)
            .ok_or_else(|| ResolveError::NodeGroupNotFound {
                cluster_id: registry.cluster_id().to_string(),
                nodegroup: ident.to_string(),
            }),
        None => registry
            .default_for_role(NodeGroupRole::Worker)
            .ok_or_else(|| ResolveError::NoDefaultNodeGroup {
                cluster_id: registry.cluster_id().to_string(),
            }),
    }
}
