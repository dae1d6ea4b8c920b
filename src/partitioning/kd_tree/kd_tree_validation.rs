use super::KdTree;
use crate::bounding_volume::BoundingVolume;
use alloc::vec::Vec;

impl KdTree {
    /// Panics if `self` isn't a well-formed KD-tree.
    ///
    /// This checks parent links, pre-order numbering, the `1 + 2 * branches` node count, that
    /// the leaf ranges partition the entry array in order, and that every non-empty leaf box
    /// encloses its entries. Leaf addresses must not have been rewritten with
    /// [`KdTree::set_leaf_first_entry`].
    pub fn assert_well_formed(&self) {
        assert!(!self.nodes.is_empty());
        assert_eq!(self.root().parent, None);
        assert_eq!(self.root().first_entry, 0);
        assert_eq!(self.root().num_entries as usize, self.entries.len());
        assert!(self.check_node_count().is_ok());

        let mut visited = Vec::with_capacity(self.nodes.len());
        let mut next_entry = 0;
        self.assert_well_formed_recurse(0, &mut visited, &mut next_entry);

        assert_eq!(visited.len(), self.nodes.len(), "unreachable nodes");
        assert_eq!(next_entry as usize, self.entries.len());
    }

    fn assert_well_formed_recurse(
        &self,
        node_id: u32,
        visited: &mut Vec<u32>,
        next_entry: &mut u32,
    ) {
        // Pre-order numbering.
        assert_eq!(node_id as usize, visited.len(), "nodes not in pre-order");
        visited.push(node_id);

        let node = &self.nodes[node_id as usize];

        match node.children {
            None => {
                assert_eq!(node.first_entry, *next_entry, "leaf ranges have gaps");
                *next_entry += node.num_entries;

                for entry in &self.entries[node.entry_range()] {
                    assert!(node.aabb.contains(&entry.aabb));
                }
            }
            Some([left_id, right_id]) => {
                assert!(node.split_axis < 3);
                let left = &self.nodes[left_id as usize];
                let right = &self.nodes[right_id as usize];

                assert_eq!(left.parent, Some(node_id));
                assert_eq!(right.parent, Some(node_id));
                assert_eq!(left.first_entry, node.first_entry);
                assert_eq!(right.first_entry, left.first_entry + left.num_entries);
                assert_eq!(node.num_entries, left.num_entries + right.num_entries);

                self.assert_well_formed_recurse(left_id, visited, next_entry);
                self.assert_well_formed_recurse(right_id, visited, next_entry);
            }
        }
    }
}
