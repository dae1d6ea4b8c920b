use super::kd_tree_split::KdSplit;
use super::{KdBuildNode, KdEntry, KdTree, KdTreeBuildParams};
use crate::bounding_volume::Aabb;
use alloc::vec;
use alloc::vec::Vec;

/// Internal consistency failures of a [`KdTree`] build.
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum KdTreeBuildError {
    /// Partitioning the entries of a node disagreed with the split statistics.
    #[error("partitioning node {node} on axis {axis} put {found} entries on its left side instead of {expected}.")]
    PartitionMismatch {
        /// The node being split.
        node: u32,
        /// The split axis.
        axis: u8,
        /// Number of left entries predicted by the split statistics.
        expected: u32,
        /// Number of left entries found by the partition.
        found: u32,
    },
    /// The number of nodes created by the recursion doesn't match the arena size.
    #[error("the build reported {reported} child nodes but the tree holds {num_nodes} nodes.")]
    CreatedNodeCountMismatch {
        /// Number of child nodes reported by the recursion.
        reported: u32,
        /// Number of nodes in the arena.
        num_nodes: u32,
    },
    /// A binary tree with `n` branch nodes must have `1 + 2n` nodes.
    #[error("a tree with {num_branches} branch nodes can't have {num_nodes} nodes.")]
    NodeCountMismatch {
        /// Number of branch nodes.
        num_branches: u32,
        /// Total number of nodes.
        num_nodes: u32,
    },
}

impl KdTree {
    /// Builds a KD-tree over `entries`.
    ///
    /// `root_aabb` must enclose the bounding box of every entry. An empty set of entries builds
    /// a tree with a single empty leaf.
    pub fn build(
        entries: Vec<KdEntry>,
        root_aabb: Aabb,
        params: &KdTreeBuildParams,
    ) -> Result<Self, KdTreeBuildError> {
        let root = KdBuildNode::leaf(None, root_aabb, 0, entries.len() as u32);
        let mut tree = KdTree {
            nodes: vec![root],
            entries,
            params: *params,
        };

        let reported = tree.build_node(0, 0)?;

        if reported as usize + 1 != tree.nodes.len() {
            return Err(KdTreeBuildError::CreatedNodeCountMismatch {
                reported,
                num_nodes: tree.nodes.len() as u32,
            });
        }

        tree.check_node_count()?;

        log::debug!(
            "Built a KD-tree with {} nodes ({} branches) over {} entries.",
            tree.nodes.len(),
            tree.num_branch_nodes(),
            tree.entries.len()
        );

        Ok(tree)
    }

    /// Checks the `1 + 2 * branches == nodes` identity of binary trees.
    pub(super) fn check_node_count(&self) -> Result<(), KdTreeBuildError> {
        let num_branches = self.num_branch_nodes();

        if 1 + 2 * num_branches != self.nodes.len() {
            Err(KdTreeBuildError::NodeCountMismatch {
                num_branches: num_branches as u32,
                num_nodes: self.nodes.len() as u32,
            })
        } else {
            Ok(())
        }
    }

    /// Recursively splits the node `node_id`. Returns the number of nodes created below it.
    fn build_node(&mut self, node_id: u32, depth: u32) -> Result<u32, KdTreeBuildError> {
        let node = self.nodes[node_id as usize];

        if node.num_entries <= self.params.split_threshold || depth > self.params.max_depth {
            return Ok(0);
        }

        let Some(split) = self.find_split(node_id, &node)? else {
            return Ok(0);
        };

        log::trace!(
            "Node {} ({} entries, depth {}): {:?} split on axis {}, {} entries left.",
            node_id,
            node.num_entries,
            depth,
            split.kind,
            split.axis,
            split.num_left
        );

        let KdSplit {
            axis,
            num_left,
            left_aabb,
            right_aabb,
            ..
        } = split;

        // Left subtree first, so indices end up in pre-order.
        let left_id = self.nodes.len() as u32;
        self.nodes.push(KdBuildNode::leaf(
            Some(node_id),
            left_aabb,
            node.first_entry,
            num_left,
        ));
        let num_left_nodes = self.build_node(left_id, depth + 1)?;

        let right_id = self.nodes.len() as u32;
        self.nodes.push(KdBuildNode::leaf(
            Some(node_id),
            right_aabb,
            node.first_entry + num_left,
            node.num_entries - num_left,
        ));
        let num_right_nodes = self.build_node(right_id, depth + 1)?;

        let node = &mut self.nodes[node_id as usize];
        node.split_axis = axis as u8;
        node.children = Some([left_id, right_id]);

        Ok(2 + num_left_nodes + num_right_nodes)
    }
}
