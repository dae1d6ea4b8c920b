use super::{KdTree, KdTreeBuildError};
use crate::math::Real;
use alloc::vec;
use alloc::vec::Vec;

/// The `content` of a [`KdChildRef`] pointing to another branch node.
pub const BRANCH_SENTINEL: u32 = 0xFFFF_FFFF;

/// Reference from a runtime branch node to one of its children.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct KdChildRef {
    /// [`BRANCH_SENTINEL`] for a branch child, the number of entries of a leaf child otherwise.
    pub content: u32,
    /// Index of the branch child, or first entry of the leaf child.
    pub index: u32,
}

impl KdChildRef {
    /// Does this reference another branch node?
    #[inline]
    pub fn is_branch(&self) -> bool {
        self.content == BRANCH_SENTINEL
    }
}

/// A branch node of the flattened KD-tree read by the collision runtime.
///
/// Leaves don't have their own runtime node: they are stored inline in their parent's
/// [`KdChildRef`].
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct KdRuntimeNode {
    /// Index of the parent runtime node. `0` for the root.
    pub parent: u32,
    /// The split axis.
    pub axis: u32,
    /// The left and right children.
    pub children: [KdChildRef; 2],
    /// The maximum of the left child and the minimum of the right child along `axis`.
    pub ext: [Real; 2],
}

impl KdTree {
    /// Flattens this tree into the runtime node array.
    ///
    /// Branch nodes are numbered depth-first, left child first, with the root at index `0`.
    /// A tree reduced to a single leaf has no runtime node.
    pub fn to_runtime_nodes(&self) -> Result<Vec<KdRuntimeNode>, KdTreeBuildError> {
        if self.root().is_leaf() {
            return Ok(vec![]);
        }

        let mut result = Vec::with_capacity(self.num_branch_nodes());
        let mut num_leaves = 0;
        // (build node, runtime parent and child slot).
        let mut stack: Vec<(u32, Option<(usize, usize)>)> = vec![(0, None)];

        while let Some((node_id, parent)) = stack.pop() {
            let node = &self.nodes[node_id as usize];
            let Some(children) = node.children else {
                continue;
            };

            let runtime_id = result.len();
            let axis = node.split_axis as usize;
            let mut runtime_node = KdRuntimeNode {
                parent: 0,
                axis: node.split_axis as u32,
                ..Default::default()
            };

            if let Some((parent_id, slot)) = parent {
                runtime_node.parent = parent_id as u32;
                let parent_node: &mut KdRuntimeNode = &mut result[parent_id];
                parent_node.children[slot].index = runtime_id as u32;
            }

            for (slot, child_id) in children.iter().enumerate() {
                let child = &self.nodes[*child_id as usize];

                runtime_node.children[slot] = if child.is_leaf() {
                    num_leaves += 1;
                    KdChildRef {
                        content: child.num_entries,
                        index: child.first_entry,
                    }
                } else {
                    KdChildRef {
                        content: BRANCH_SENTINEL,
                        index: 0,
                    }
                };
            }

            let [left, right] = children;
            runtime_node.ext = [
                self.nodes[left as usize].aabb.maxs[axis],
                self.nodes[right as usize].aabb.mins[axis],
            ];
            result.push(runtime_node);

            // Right pushed first so the left subtree gets the next indices.
            stack.push((right, Some((runtime_id, 1))));
            stack.push((left, Some((runtime_id, 0))));
        }

        // Every node of the arena must be reached, and the reached nodes must form a full
        // binary tree.
        let num_branches = result.len();
        let num_nodes = self.nodes.len();
        if num_branches + num_leaves != num_nodes || 1 + 2 * num_branches != num_nodes {
            return Err(KdTreeBuildError::NodeCountMismatch {
                num_branches: num_branches as u32,
                num_nodes: num_nodes as u32,
            });
        }

        Ok(result)
    }
}
