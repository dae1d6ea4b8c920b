use crate::bounding_volume::Aabb;
use crate::partitioning::{KdRuntimeNode, KdTree, KdTreeBuildError};
use crate::serialization::ByteWriter;
use alloc::vec::Vec;

/// Size in bytes of a serialized KD-tree header.
pub const KD_TREE_HEADER_SIZE: usize = 48;

/// Size in bytes of a serialized runtime branch node.
pub const KD_TREE_NODE_SIZE: usize = 32;

/// Appends a flattened KD-tree to `writer`.
///
/// `num_entries` is the number of entries indexed by the tree and `aabb` the bounding box of
/// its root.
pub fn write_kd_tree(
    writer: &mut ByteWriter,
    nodes: &[KdRuntimeNode],
    num_entries: u32,
    aabb: &Aabb,
) {
    writer.put_u32(KD_TREE_HEADER_SIZE as u32);
    writer.put_u32(nodes.len() as u32);
    writer.put_u32(num_entries);
    writer.put_u32(0);
    writer.put_point_padded(&aabb.mins);
    writer.put_point_padded(&aabb.maxs);

    for node in nodes {
        writer.put_u32(node.parent);
        writer.put_u32(node.axis);
        for child in &node.children {
            writer.put_u32(child.content);
            writer.put_u32(child.index);
        }
        writer.put_f32(node.ext[0]);
        writer.put_f32(node.ext[1]);
    }
}

impl KdTree {
    /// Flattens and serializes this tree.
    pub fn to_bytes(&self) -> Result<Vec<u8>, KdTreeBuildError> {
        let nodes = self.to_runtime_nodes()?;
        let mut writer =
            ByteWriter::with_capacity(KD_TREE_HEADER_SIZE + nodes.len() * KD_TREE_NODE_SIZE);
        write_kd_tree(
            &mut writer,
            &nodes,
            self.entries().len() as u32,
            &self.root_aabb(),
        );
        Ok(writer.into_bytes())
    }
}

#[cfg(test)]
mod test {
    use super::{write_kd_tree, KD_TREE_HEADER_SIZE};
    use crate::bounding_volume::Aabb;
    use crate::math::Point;
    use crate::partitioning::{KdChildRef, KdRuntimeNode, BRANCH_SENTINEL};
    use crate::serialization::ByteWriter;

    #[test]
    fn kd_tree_layout() {
        let nodes = [
            KdRuntimeNode {
                parent: 0,
                axis: 2,
                children: [
                    KdChildRef {
                        content: BRANCH_SENTINEL,
                        index: 1,
                    },
                    KdChildRef {
                        content: 3,
                        index: 7,
                    },
                ],
                ext: [1.5, 2.0],
            },
            KdRuntimeNode::default(),
        ];
        let aabb = Aabb::new(Point::new(-1.0, -2.0, -3.0), Point::new(1.0, 2.0, 3.0));

        let mut writer = ByteWriter::new();
        write_kd_tree(&mut writer, &nodes, 10, &aabb);
        let bytes = writer.into_bytes();

        assert_eq!(bytes.len(), KD_TREE_HEADER_SIZE + 2 * 32);
        assert_eq!(bytes[0..16], [0, 0, 0, 48, 0, 0, 0, 2, 0, 0, 0, 10, 0, 0, 0, 0]);
        assert_eq!(bytes[16..20], (-1.0f32).to_be_bytes());
        assert_eq!(bytes[40..44], 3.0f32.to_be_bytes());
        assert_eq!(
            bytes[48..72],
            [
                0, 0, 0, 0, 0, 0, 0, 2, 0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 1, 0, 0, 0, 3, 0, 0, 0, 7
            ]
        );
        assert_eq!(bytes[72..76], 1.5f32.to_be_bytes());
        assert_eq!(bytes[76..80], 2.0f32.to_be_bytes());
    }
}
