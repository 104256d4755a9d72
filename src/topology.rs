//! Cluster topology as seen by the planner.
//!
//! The planner only needs three facts about the cluster:
//! - the ordered [`NodeGroup`] that workers are indexed against,
//! - how many processing channels each worker process runs,
//! - how wide the cluster is, in distinct nodes and in workers.
//!
//! Membership and ordering are owned by the cluster registration layer;
//! [`Topology`] is the narrow read-only view of it. [`StaticTopology`] is a
//! fixed in-memory implementation, sufficient for a single planning pass.

use crate::NodeId;
use serde::{Deserialize, Serialize};

/// Ordered, fixed-size sequence of worker node identities.
///
/// Position `i` in the group is worker `i`. A host running several workers
/// occurs once per worker.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeGroup {
    nodes: Vec<NodeId>,
}

impl NodeGroup {
    /// Build a group from nodes in worker order.
    pub fn new(nodes: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
        }
    }

    /// Number of worker positions (the group ordinality).
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node at worker position `pos`.
    #[must_use]
    pub fn node(&self, pos: usize) -> Option<&NodeId> {
        self.nodes.get(pos)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.iter()
    }

    /// Number of distinct hosts in the group.
    #[must_use]
    pub fn distinct_nodes(&self) -> usize {
        let mut seen: Vec<&NodeId> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !seen.contains(&node) {
                seen.push(node);
            }
        }
        seen.len()
    }
}

/// Read-only view of the cluster used while planning.
pub trait Topology: Send + Sync {
    /// The ordered node group that worker indices refer to.
    fn group(&self) -> &NodeGroup;

    /// Processing channels per worker process.
    fn channels_per_worker(&self) -> usize;

    /// Number of distinct physical nodes in the cluster.
    fn node_cluster_width(&self) -> usize;

    /// Number of workers in the target cluster.
    fn cluster_width(&self) -> usize {
        self.group().len()
    }
}

/// A topology fixed at construction time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StaticTopology {
    group: NodeGroup,
    channels_per_worker: usize,
    node_cluster_width: usize,
}

impl StaticTopology {
    /// One channel per worker; node width is derived from the group.
    #[must_use]
    pub fn new(group: NodeGroup) -> Self {
        let node_cluster_width = group.distinct_nodes().max(1);
        Self {
            group,
            channels_per_worker: 1,
            node_cluster_width,
        }
    }

    /// Set the number of channels each worker runs.
    #[must_use]
    pub fn with_channels_per_worker(mut self, channels: usize) -> Self {
        self.channels_per_worker = channels.max(1);
        self
    }

    /// Override the distinct node count (defaults to the distinct hosts in the group).
    #[must_use]
    pub fn with_node_cluster_width(mut self, width: usize) -> Self {
        self.node_cluster_width = width.max(1);
        self
    }
}

impl Topology for StaticTopology {
    fn group(&self) -> &NodeGroup {
        &self.group
    }

    fn channels_per_worker(&self) -> usize {
        self.channels_per_worker
    }

    fn node_cluster_width(&self) -> usize {
        self.node_cluster_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_nodes_counts_repeated_hosts_once() {
        let group = NodeGroup::new(["a", "b", "a", "b"].map(NodeId::from));
        assert_eq!(group.len(), 4);
        assert_eq!(group.distinct_nodes(), 2);

        let topo = StaticTopology::new(group).with_channels_per_worker(2);
        assert_eq!(topo.node_cluster_width(), 2);
        assert_eq!(topo.cluster_width(), 4);
        assert_eq!(topo.channels_per_worker(), 2);
    }
}
