use crate::cluster::{ClusterError, UnitCluster, UNIT_SIZE};
use crate::partitioning::KdTree;
use crate::utils::floor_log2;
use alloc::vec::Vec;

/// What a subtree of the KD-tree collapsed into.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum SubtreeClusters {
    /// No unit at all.
    Empty,
    /// Exactly one cluster, on top of the cluster stack.
    Single,
    /// Several clusters.
    Multiple,
}

/// The clusters of a mesh and the parameters of their unit addresses.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClusterLayout {
    /// The clusters, indexed by their id.
    pub clusters: Vec<UnitCluster>,
    /// The size in bytes of the largest unit stream of a cluster.
    pub max_unit_stream_bytes: u32,
    /// Number of low bits of a unit address holding the byte offset inside its cluster.
    pub unit_offset_bits: u32,
}

impl ClusterLayout {
    /// Number of bits needed by the unit offset part of an address for the given largest unit
    /// stream size.
    pub fn unit_offset_bits_for(max_unit_stream_bytes: u32) -> u32 {
        1 + floor_log2(max_unit_stream_bytes.max(1))
    }

    /// The address of the unit starting `byte_offset` bytes into the unit stream of a cluster.
    pub fn unit_address(&self, cluster_id: u32, byte_offset: u32) -> Result<u32, ClusterError> {
        let address = ((cluster_id as u64) << self.unit_offset_bits) | byte_offset as u64;
        u32::try_from(address).map_err(|_| ClusterError::AddressOverflow {
            cluster: cluster_id,
            unit_offset_bits: self.unit_offset_bits,
        })
    }

    /// The total number of units of every cluster.
    pub fn num_units(&self) -> usize {
        self.clusters.iter().map(|c| c.num_units()).sum()
    }
}

struct ClusterWalker<'a> {
    tree: &'a KdTree,
    triangles: &'a [[u32; 3]],
    clusters: Vec<UnitCluster>,
    /// For each cluster, the leaves whose first unit it holds, with that unit index.
    leaf_units: Vec<Vec<(u32, u32)>>,
    /// Leaves without any unit.
    empty_leaves: Vec<u32>,
    num_merges: usize,
}

impl ClusterWalker<'_> {
    fn start_cluster(&mut self) {
        self.clusters.push(UnitCluster::new(self.clusters.len() as u32));
        self.leaf_units.push(Vec::new());
    }

    fn walk(&mut self, node_id: u32) -> SubtreeClusters {
        let node = &self.tree.nodes()[node_id as usize];

        let Some([left, right]) = node.children else {
            return self.walk_leaf(node_id);
        };

        let left = self.walk(left);
        let right = self.walk(right);

        match (left, right) {
            (SubtreeClusters::Empty, other) | (other, SubtreeClusters::Empty) => other,
            (SubtreeClusters::Single, SubtreeClusters::Single) => {
                if self.merge_top_clusters() {
                    SubtreeClusters::Single
                } else {
                    SubtreeClusters::Multiple
                }
            }
            _ => SubtreeClusters::Multiple,
        }
    }

    fn walk_leaf(&mut self, node_id: u32) -> SubtreeClusters {
        let (tree, triangles) = (self.tree, self.triangles);
        let node = &tree.nodes()[node_id as usize];

        if node.num_entries == 0 {
            self.empty_leaves.push(node_id);
            return SubtreeClusters::Empty;
        }

        let first_cluster = self.clusters.len();
        self.start_cluster();
        self.leaf_units[first_cluster].push((node_id, 0));

        for entry in &tree.entries()[node.entry_range()] {
            let tri = &triangles[entry.entry_index as usize];
            let Some(cluster) = self.clusters.last_mut() else {
                continue;
            };

            if !cluster.try_add_triangle(entry.entry_index, tri) {
                self.start_cluster();
                if let Some(cluster) = self.clusters.last_mut() {
                    let added = cluster.try_add_triangle(entry.entry_index, tri);
                    debug_assert!(added, "a fresh cluster always has room for one triangle");
                }
            }
        }

        for cluster in &mut self.clusters[first_cluster..] {
            cluster.compact_vertices();
        }

        if self.clusters.len() == first_cluster + 1 {
            SubtreeClusters::Single
        } else {
            SubtreeClusters::Multiple
        }
    }

    /// Merges the top cluster of the stack into the one below it, if the result fits.
    fn merge_top_clusters(&mut self) -> bool {
        let num_clusters = self.clusters.len();
        if num_clusters < 2 {
            return false;
        }

        let (lower, upper) = self.clusters.split_at_mut(num_clusters - 1);
        let target = &mut lower[num_clusters - 2];
        let source = &upper[0];
        let unit_shift = target.num_units() as u32;

        if !target.try_merge(source) {
            return false;
        }

        let _ = self.clusters.pop();
        if let Some(moved) = self.leaf_units.pop() {
            if let Some(target_leaves) = self.leaf_units.last_mut() {
                target_leaves.extend(
                    moved
                        .into_iter()
                        .map(|(leaf, unit)| (leaf, unit + unit_shift)),
                );
            }
        }

        self.num_merges += 1;
        true
    }
}

/// Groups the triangles of a mesh into clusters following the leaves of its KD-tree.
///
/// The tree is walked depth-first. Every non-empty leaf starts a new cluster and fills it with
/// its triangles in order, spilling over into new clusters when the vertex pool is full. At
/// each branch whose subtrees both collapsed into a single cluster, these two clusters are
/// merged if their vertex pools fit in one.
///
/// Once the clusters are final, the `first_entry` of every leaf of `tree` is replaced by the
/// address of its first unit (see [`ClusterLayout::unit_address`]); empty leaves get `0`.
pub fn build_clusters(
    tree: &mut KdTree,
    triangles: &[[u32; 3]],
) -> Result<ClusterLayout, ClusterError> {
    let mut walker = ClusterWalker {
        tree: &*tree,
        triangles,
        clusters: Vec::new(),
        leaf_units: Vec::new(),
        empty_leaves: Vec::new(),
        num_merges: 0,
    };

    let _ = walker.walk(0);

    let ClusterWalker {
        mut clusters,
        leaf_units,
        empty_leaves,
        num_merges,
        ..
    } = walker;

    for (id, cluster) in clusters.iter_mut().enumerate() {
        cluster.cluster_id = id as u32;
    }

    let max_unit_stream_bytes = clusters
        .iter()
        .map(|c| c.unit_stream_size() as u32)
        .max()
        .unwrap_or(0);

    let layout = ClusterLayout {
        clusters,
        max_unit_stream_bytes,
        unit_offset_bits: ClusterLayout::unit_offset_bits_for(max_unit_stream_bytes),
    };

    for (cluster_id, leaves) in leaf_units.iter().enumerate() {
        for (leaf, unit) in leaves {
            let address = layout.unit_address(cluster_id as u32, unit * UNIT_SIZE as u32)?;
            tree.set_leaf_first_entry(*leaf, address);
        }
    }

    for leaf in empty_leaves {
        tree.set_leaf_first_entry(leaf, 0);
    }

    log::debug!(
        "Grouped {} units into {} clusters ({} merges, largest unit stream: {} bytes).",
        layout.num_units(),
        layout.clusters.len(),
        num_merges,
        layout.max_unit_stream_bytes
    );

    Ok(layout)
}

#[cfg(test)]
mod test {
    use super::{build_clusters, ClusterLayout};
    use crate::bounding_volume::Aabb;
    use crate::cluster::UNIT_SIZE;
    use crate::math::{Point, Real};
    use crate::partitioning::{KdEntry, KdTree, KdTreeBuildParams};
    use alloc::vec::Vec;

    fn grid(n: u32) -> (Vec<Point<Real>>, Vec<[u32; 3]>) {
        let vertices = (0..=n)
            .flat_map(|i| (0..=n).map(move |j| Point::new(i as Real, 0.0, j as Real)))
            .collect();
        let mut triangles = Vec::new();
        for i in 0..n {
            for j in 0..n {
                let v = i * (n + 1) + j;
                triangles.push([v, v + 1, v + n + 2]);
                triangles.push([v, v + n + 2, v + n + 1]);
            }
        }
        (vertices, triangles)
    }

    fn kd_tree(vertices: &[Point<Real>], triangles: &[[u32; 3]]) -> KdTree {
        let entries = triangles
            .iter()
            .enumerate()
            .map(|(tid, tri)| KdEntry::from_triangle(tid as u32, vertices, tri))
            .collect();
        let aabb = Aabb::from_points_ref(vertices);
        KdTree::build(entries, aabb, &KdTreeBuildParams::default()).unwrap()
    }

    #[test]
    fn small_mesh_collapses_into_one_cluster() {
        let (vertices, triangles) = grid(3);
        let mut tree = kd_tree(&vertices, &triangles);
        assert!(tree.num_branch_nodes() > 0);

        let layout = build_clusters(&mut tree, &triangles).unwrap();
        assert_eq!(layout.clusters.len(), 1);
        assert_eq!(layout.clusters[0].num_units(), 18);
        assert_eq!(layout.clusters[0].num_vertices(), 16);
        assert_eq!(layout.max_unit_stream_bytes, 18 * UNIT_SIZE as u32);
        layout.clusters[0].assert_well_formed(&triangles);
    }

    #[test]
    fn every_triangle_lands_in_exactly_one_cluster() {
        let (vertices, triangles) = grid(40);
        let mut tree = kd_tree(&vertices, &triangles);
        let original = tree.clone();

        let layout = build_clusters(&mut tree, &triangles).unwrap();
        assert!(layout.clusters.len() > 1);

        let mut seen = alloc::vec![0; triangles.len()];
        for (id, cluster) in layout.clusters.iter().enumerate() {
            assert_eq!(cluster.cluster_id, id as u32);
            cluster.assert_well_formed(&triangles);
            for tid in &cluster.unit_ids {
                seen[*tid as usize] += 1;
            }
        }
        assert!(seen.iter().all(|count| *count == 1));
        assert_eq!(layout.num_units(), triangles.len());

        // Each leaf address points to the first triangle of that leaf.
        let mask = (1 << layout.unit_offset_bits) - 1;
        for leaf in original.leaves() {
            let node = &original.nodes()[leaf as usize];
            if node.num_entries == 0 {
                continue;
            }

            let address = tree.nodes()[leaf as usize].first_entry;
            let cluster = &layout.clusters[(address >> layout.unit_offset_bits) as usize];
            let unit = (address & mask) as usize / UNIT_SIZE;
            assert_eq!((address & mask) as usize % UNIT_SIZE, 0);
            assert_eq!(
                cluster.unit_ids[unit],
                original.entries()[node.first_entry as usize].entry_index
            );
        }
    }

    #[test]
    fn unit_offset_bits() {
        assert_eq!(ClusterLayout::unit_offset_bits_for(0), 1);
        assert_eq!(ClusterLayout::unit_offset_bits_for(9), 4);
        assert_eq!(ClusterLayout::unit_offset_bits_for(16), 5);

        let layout = ClusterLayout {
            unit_offset_bits: 4,
            ..Default::default()
        };
        assert_eq!(layout.unit_address(3, 9), Ok(0x39));
        assert!(layout.unit_address(u32::MAX, 0).is_err());
    }
}
