//! Delta planning — how far and in which direction a nodegroup moves.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use nodeforge_state::{NodeGroup, NodeId};

use crate::error::PlanError;

/// Direction of a planned resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleDirection {
    ScaleUp,
    ScaleDown,
    /// Requested count equals the current count. Still dispatched.
    NoOp,
}

/// The change a resize will ask the backend to make.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScalingPlan {
    pub direction: ScaleDirection,
    /// `requested - current`.
    pub delta: i64,
    pub target_node_count: u32,
    /// Nodes the caller asked to remove. Empty means the backend picks.
    pub nodes_to_remove: Vec<NodeId>,
}

/// Plan a resize of `nodegroup` to `requested` nodes.
///
/// Explicit removals only matter when scaling down; an empty list is the
/// same as no list. When given, the list must name exactly `|delta|`
/// distinct members of the nodegroup.
pub fn plan(
    nodegroup: &NodeGroup,
    requested: u32,
    explicit_removals: Option<&[NodeId]>,
) -> Result<ScalingPlan, PlanError> {
    let delta = i64::from(requested) - i64::from(nodegroup.node_count);
    let removals = explicit_removals.filter(|nodes| !nodes.is_empty());

    let (direction, nodes_to_remove) = match delta {
        d if d > 0 => (ScaleDirection::ScaleUp, Vec::new()),
        0 => (ScaleDirection::NoOp, Vec::new()),
        d => {
            let nodes = match removals {
                Some(nodes) => checked_removals(nodegroup, d.unsigned_abs() as u32, nodes)?,
                None => Vec::new(),
            };
            (ScaleDirection::ScaleDown, nodes)
        }
    };

    if direction != ScaleDirection::ScaleDown && removals.is_some() {
        debug!(
            nodegroup = %nodegroup.name,
            ?direction,
            "ignoring nodes_to_remove on a resize that removes nothing"
        );
    }

    Ok(ScalingPlan {
        direction,
        delta,
        target_node_count: requested,
        nodes_to_remove,
    })
}

fn checked_removals(
    nodegroup: &NodeGroup,
    expected: u32,
    nodes: &[NodeId],
) -> Result<Vec<NodeId>, PlanError> {
    if nodes.len() != expected as usize {
        return Err(PlanError::RemovalCountMismatch {
            expected,
            given: nodes.len(),
        });
    }

    if let Some(unknown) = nodes.iter().find(|n| !nodegroup.has_node(n)) {
        return Err(PlanError::UnknownNode {
            nodegroup: nodegroup.name.clone(),
            node: unknown.clone(),
        });
    }

    let distinct: HashSet<&NodeId> = nodes.iter().collect();
    if distinct.len() != nodes.len() {
        return Err(PlanError::RemovalCountMismatch {
            expected,
            given: distinct.len(),
        });
    }

    Ok(nodes.to_vec())
}
