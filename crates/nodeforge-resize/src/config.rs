//! Resize policy handed to the engine at construction.

use nodeforge_core::ResizeSection;

/// Engine-wide resize policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResizeConfig {
    /// Upper bound applied to every nodegroup in addition to its own
    /// `max_node_count`. `None` disables the check.
    pub max_nodes_per_nodegroup: Option<u32>,
}

impl From<&ResizeSection> for ResizeConfig {
    fn from(section: &ResizeSection) -> Self {
        Self {
            max_nodes_per_nodegroup: section.max_nodes_per_nodegroup,
        }
    }
}
