use super::{KdBuildNode, KdEntry, KdTree, KdTreeBuildError, KdTreeBuildParams};
use crate::bounding_volume::{Aabb, BoundingVolume};
use crate::math::{Real, DIM};
use core::cmp::Reverse;
use ordered_float::OrderedFloat;

/// The heuristic that produced a KD-tree split.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KdSplitKind {
    /// One child is empty and the other is the node box shrunk on one face.
    EmptyLeaf,
    /// Split at the middle of the entry centroids, chosen with the surface area heuristic.
    SurfaceArea,
    /// Large entries are separated from small ones.
    LargeItem,
    /// Entries are sorted by area and split without regard to their position.
    NonSpatial,
}

#[derive(Copy, Clone, Debug)]
pub(super) struct KdSplit {
    pub kind: KdSplitKind,
    pub axis: usize,
    pub num_left: u32,
    pub left_aabb: Aabb,
    pub right_aabb: Aabb,
}

#[derive(Copy, Clone, Debug)]
struct AxisStats {
    num_left: u32,
    num_right: u32,
    left_aabb: Aabb,
    right_aabb: Aabb,
}

impl Default for AxisStats {
    fn default() -> Self {
        Self {
            num_left: 0,
            num_right: 0,
            left_aabb: Aabb::new_invalid(),
            right_aabb: Aabb::new_invalid(),
        }
    }
}

impl AxisStats {
    fn add(&mut self, entry: &KdEntry, right: bool) {
        if right {
            self.num_right += 1;
            self.right_aabb.merge(&entry.aabb);
        } else {
            self.num_left += 1;
            self.left_aabb.merge(&entry.aabb);
        }
    }

    /// The relative SAH cost of this split, `None` if one side is empty.
    fn cost(&self, node_area: f64) -> Option<f64> {
        if self.num_left == 0 || self.num_right == 0 {
            return None;
        }

        let n = (self.num_left + self.num_right) as f64;
        let weighted = self.num_left as f64 * self.left_aabb.surface_area()
            + self.num_right as f64 * self.right_aabb.surface_area();
        Some(weighted / (n * node_area))
    }
}

fn entries_aabb(entries: &[KdEntry]) -> Aabb {
    entries.iter().fold(Aabb::new_invalid(), |mut aabb, e| {
        aabb.merge(&e.aabb);
        aabb
    })
}

/// Moves the entries matching `goes_right` to the end of `entries`. Returns the number of
/// entries left at the front.
fn partition(entries: &mut [KdEntry], goes_right: impl Fn(&KdEntry) -> bool) -> usize {
    let mut left = 0;
    let mut right = entries.len();

    while left < right {
        if goes_right(&entries[left]) {
            right -= 1;
            entries.swap(left, right);
        } else {
            left += 1;
        }
    }

    left
}

/// Picks the axis with the lowest acceptable cost. Ties go to the lowest axis.
fn best_axis(stats: &[AxisStats; DIM], node_area: f64, max_cost: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;

    for (axis, stat) in stats.iter().enumerate() {
        if let Some(cost) = stat.cost(node_area) {
            if best.map(|(_, best_cost)| cost < best_cost).unwrap_or(true) {
                best = Some((axis, cost));
            }
        }
    }

    best.filter(|(_, cost)| *cost < max_cost)
        .map(|(axis, _)| axis)
}

impl KdTree {
    /// Finds how to split the node `node_id`, trying each heuristic in turn, and partitions its
    /// entries accordingly. Returns `None` if the node should stay a leaf.
    pub(super) fn find_split(
        &mut self,
        node_id: u32,
        node: &KdBuildNode,
    ) -> Result<Option<KdSplit>, KdTreeBuildError> {
        let params = self.params;
        let entries = &mut self.entries[node.entry_range()];
        let node_area = node.aabb.surface_area();

        if let Some(split) = empty_leaf_split(entries, node, node_area, &params) {
            return Ok(Some(split));
        }

        if let Some(split) = surface_area_split(entries, node_id, node, node_area, &params)? {
            return Ok(Some(split));
        }

        if params.large_item_threshold < 1.0 {
            if let Some(split) = large_item_split(entries, node_id, node, node_area, &params)? {
                return Ok(Some(split));
            }
        }

        Ok(non_spatial_split(entries, node, node_area, &params))
    }
}

fn empty_leaf_split(
    entries: &[KdEntry],
    node: &KdBuildNode,
    node_area: f64,
    params: &KdTreeBuildParams,
) -> Option<KdSplit> {
    if node_area <= 0.0 {
        return None;
    }

    let tight = entries_aabb(entries);
    let max_area = params.empty_leaf_threshold * node_area;
    let num_entries = entries.len() as u32;

    for axis in 0..DIM {
        let pushed_min = node.aabb.with_min(axis, tight.mins[axis]);
        if pushed_min.surface_area() < max_area {
            return Some(KdSplit {
                kind: KdSplitKind::EmptyLeaf,
                axis,
                num_left: 0,
                left_aabb: Aabb::new_invalid(),
                right_aabb: pushed_min,
            });
        }

        let pushed_max = node.aabb.with_max(axis, tight.maxs[axis]);
        if pushed_max.surface_area() < max_area {
            return Some(KdSplit {
                kind: KdSplitKind::EmptyLeaf,
                axis,
                num_left: num_entries,
                left_aabb: pushed_max,
                right_aabb: Aabb::new_invalid(),
            });
        }
    }

    None
}

fn surface_area_split(
    entries: &mut [KdEntry],
    node_id: u32,
    node: &KdBuildNode,
    node_area: f64,
    params: &KdTreeBuildParams,
) -> Result<Option<KdSplit>, KdTreeBuildError> {
    let centroid_aabb = Aabb::from_points(entries.iter().map(|e| e.centroid()));
    let split_values: [Real; DIM] = core::array::from_fn(|axis| {
        (centroid_aabb.mins[axis] + centroid_aabb.maxs[axis]) * 0.5
    });

    let mut stats = [AxisStats::default(); DIM];
    for entry in entries.iter() {
        let centroid = entry.centroid();
        for axis in 0..DIM {
            stats[axis].add(entry, centroid[axis] > split_values[axis]);
        }
    }

    let Some(axis) = best_axis(&stats, node_area, params.max_split_cost) else {
        return Ok(None);
    };

    let split_value = split_values[axis];
    let num_left = partition(entries, |e| e.centroid()[axis] > split_value);

    finish_spatial_split(
        KdSplitKind::SurfaceArea,
        node_id,
        node,
        axis,
        &stats[axis],
        num_left,
    )
    .map(Some)
}

fn large_item_split(
    entries: &mut [KdEntry],
    node_id: u32,
    node: &KdBuildNode,
    node_area: f64,
    params: &KdTreeBuildParams,
) -> Result<Option<KdSplit>, KdTreeBuildError> {
    let node_extents = node.aabb.extents_f64();
    let limits: [f64; DIM] =
        core::array::from_fn(|axis| params.large_item_threshold * node_extents[axis]);

    let mut stats = [AxisStats::default(); DIM];
    for entry in entries.iter() {
        let extents = entry.aabb.extents_f64();
        for axis in 0..DIM {
            stats[axis].add(entry, extents[axis] >= limits[axis]);
        }
    }

    let Some(axis) = best_axis(&stats, node_area, params.max_split_cost) else {
        return Ok(None);
    };

    let limit = limits[axis];
    let num_left = partition(entries, |e| e.aabb.extents_f64()[axis] >= limit);

    finish_spatial_split(
        KdSplitKind::LargeItem,
        node_id,
        node,
        axis,
        &stats[axis],
        num_left,
    )
    .map(Some)
}

fn finish_spatial_split(
    kind: KdSplitKind,
    node_id: u32,
    node: &KdBuildNode,
    axis: usize,
    stats: &AxisStats,
    num_left: usize,
) -> Result<KdSplit, KdTreeBuildError> {
    if num_left as u32 != stats.num_left {
        return Err(KdTreeBuildError::PartitionMismatch {
            node: node_id,
            axis: axis as u8,
            expected: stats.num_left,
            found: num_left as u32,
        });
    }

    debug_assert_eq!(stats.num_left + stats.num_right, node.num_entries);

    Ok(KdSplit {
        kind,
        axis,
        num_left: stats.num_left,
        left_aabb: stats.left_aabb,
        right_aabb: stats.right_aabb,
    })
}

fn non_spatial_split(
    entries: &mut [KdEntry],
    node: &KdBuildNode,
    node_area: f64,
    params: &KdTreeBuildParams,
) -> Option<KdSplit> {
    let n = entries.len();
    let min_area = entries
        .iter()
        .map(|e| OrderedFloat(e.area))
        .min()
        .map(|a| a.0)
        .unwrap_or(0.0);

    if !(min_area < params.min_similar_area_threshold * node_area
        || n >= params.max_entries_per_node as usize)
    {
        return None;
    }

    entries.sort_by_key(|e| Reverse(OrderedFloat(e.area)));

    let mean_area = entries.iter().map(|e| e.area).sum::<f64>() / n as f64;
    let mut split = entries
        .iter()
        .position(|e| e.area <= mean_area)
        .unwrap_or(n / 2);

    let min_side = ((params.min_child_entries_threshold * n as f64) as usize)
        .max(1)
        .min(n / 2);
    split = split.clamp(min_side, n - min_side);

    let left_aabb = entries_aabb(&entries[..split]);
    let right_aabb = entries_aabb(&entries[split..]);

    // Choose the axis where the node box clipped to each side of the plane covers the least.
    let mut best_axis = 0;
    let mut best_area = f64::MAX;
    for axis in 0..DIM {
        let area = node.aabb.with_max(axis, left_aabb.maxs[axis]).surface_area()
            + node.aabb.with_min(axis, right_aabb.mins[axis]).surface_area();
        if area < best_area {
            best_area = area;
            best_axis = axis;
        }
    }

    Some(KdSplit {
        kind: KdSplitKind::NonSpatial,
        axis: best_axis,
        num_left: split as u32,
        left_aabb,
        right_aabb,
    })
}
