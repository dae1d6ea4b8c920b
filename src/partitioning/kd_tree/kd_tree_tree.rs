use crate::bounding_volume::{Aabb, BoundingVolume};
use crate::math::{Point, Real};
use alloc::vec::Vec;
use core::ops::Range;

/// Parameters controlling the construction of a [`KdTree`].
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct KdTreeBuildParams {
    /// Nodes with at most this many entries are never split.
    pub split_threshold: u32,
    /// Nodes with at least this many entries always try the non-spatial split.
    pub max_entries_per_node: u32,
    /// Fraction of the entries of a node each side of a non-spatial split must receive.
    pub min_child_entries_threshold: f64,
    /// The non-spatial split is tried when the smallest entry area is below this fraction of
    /// the node area.
    pub min_similar_area_threshold: f64,
    /// Entries at least this fraction of the node extent are "large". The large-item split is
    /// disabled when this is `1.0` or more.
    pub large_item_threshold: f64,
    /// An empty-leaf split is accepted when the non-empty child area is below this fraction of
    /// the node area.
    pub empty_leaf_threshold: f64,
    /// A spatial split is accepted when its relative SAH cost is below this value.
    pub max_split_cost: f64,
    /// Nodes deeper than this are never split.
    pub max_depth: u32,
}

impl Default for KdTreeBuildParams {
    fn default() -> Self {
        Self {
            split_threshold: 8,
            max_entries_per_node: 63,
            min_child_entries_threshold: 0.2,
            min_similar_area_threshold: 0.3,
            large_item_threshold: 1.0,
            empty_leaf_threshold: 0.6,
            max_split_cost: 0.95,
            max_depth: 32,
        }
    }
}

/// An element partitioned by a [`KdTree`].
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct KdEntry {
    /// Index of the element (for a clustered mesh, the triangle index).
    pub entry_index: u32,
    /// The bounding box of the element.
    pub aabb: Aabb,
    /// The surface area of `aabb`.
    pub area: f64,
}

impl KdEntry {
    /// Creates an entry for the element `entry_index` bounded by `aabb`.
    pub fn new(entry_index: u32, aabb: Aabb) -> Self {
        Self {
            entry_index,
            aabb,
            area: aabb.surface_area(),
        }
    }

    /// Creates the entry of a triangle from its vertices.
    pub fn from_triangle(tid: u32, vertices: &[Point<Real>], tri: &[u32; 3]) -> Self {
        Self::new(
            tid,
            Aabb::from_points(tri.iter().map(|v| vertices[*v as usize])),
        )
    }

    /// The center of the bounding box of this entry.
    #[inline]
    pub fn centroid(&self) -> Point<Real> {
        self.aabb.center()
    }
}

/// A node of a [`KdTree`] under construction.
///
/// Nodes are stored in an arena and reference each other by index. A leaf covers the
/// `num_entries` entries starting at `first_entry` of the entry array of its tree, and a branch
/// covers the union of its children ranges.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct KdBuildNode {
    /// Index of the parent node, `None` for the root.
    pub parent: Option<u32>,
    /// The bounding box of this node. Inverted for empty leaves.
    pub aabb: Aabb,
    /// Index of the first entry covered by this node.
    ///
    /// After unit addressing (see [`KdTree::set_leaf_first_entry`]) this is the address of the
    /// first unit of the leaf instead.
    pub first_entry: u32,
    /// Number of entries covered by this node.
    pub num_entries: u32,
    /// The axis of the splitting plane of a branch node.
    pub split_axis: u8,
    /// The left and right children of a branch node. `None` for leaves.
    pub children: Option<[u32; 2]>,
}

impl KdBuildNode {
    pub(super) fn leaf(
        parent: Option<u32>,
        aabb: Aabb,
        first_entry: u32,
        num_entries: u32,
    ) -> Self {
        Self {
            parent,
            aabb,
            first_entry,
            num_entries,
            split_axis: 0,
            children: None,
        }
    }

    /// Is this node a leaf?
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// The range of entries covered by this node.
    #[inline]
    pub fn entry_range(&self) -> Range<usize> {
        self.first_entry as usize..(self.first_entry + self.num_entries) as usize
    }
}

/// A KD-tree built with a surface area heuristic over a set of bounded entries.
///
/// The tree owns one entry array that the build partitions in place: the entries of every leaf
/// are contiguous, and leaves visited left-first cover the array in order. Node `0` is the root
/// and nodes are numbered in pre-order.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct KdTree {
    pub(super) nodes: Vec<KdBuildNode>,
    pub(super) entries: Vec<KdEntry>,
    pub(super) params: KdTreeBuildParams,
}

impl KdTree {
    /// The nodes of this tree, root first.
    #[inline]
    pub fn nodes(&self) -> &[KdBuildNode] {
        &self.nodes
    }

    /// The entries of this tree, in leaf order.
    #[inline]
    pub fn entries(&self) -> &[KdEntry] {
        &self.entries
    }

    /// The parameters this tree was built with.
    #[inline]
    pub fn params(&self) -> &KdTreeBuildParams {
        &self.params
    }

    /// The root node of this tree.
    #[inline]
    pub fn root(&self) -> &KdBuildNode {
        &self.nodes[0]
    }

    /// The bounding box of the root node.
    #[inline]
    pub fn root_aabb(&self) -> Aabb {
        self.nodes[0].aabb
    }

    /// The number of nodes of this tree.
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// The number of branch nodes of this tree.
    pub fn num_branch_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| !n.is_leaf()).count()
    }

    /// The number of leaves of this tree.
    pub fn num_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Iterates through the index of every leaf, left to right.
    pub fn leaves(&self) -> impl Iterator<Item = u32> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_leaf())
            .map(|(id, _)| id as u32)
    }

    /// Replaces the `first_entry` field of a leaf.
    ///
    /// Clustering uses this to turn entry indices into unit addresses once the entries have been
    /// assigned to clusters. Branch nodes are left untouched.
    pub fn set_leaf_first_entry(&mut self, node: u32, first_entry: u32) {
        let node = &mut self.nodes[node as usize];
        if node.is_leaf() {
            node.first_entry = first_entry;
        }
    }
}
