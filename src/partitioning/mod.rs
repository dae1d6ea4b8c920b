//! Spatial partitioning tools.

pub use self::kd_tree::{
    KdBuildNode, KdChildRef, KdEntry, KdRuntimeNode, KdSplitKind, KdTree, KdTreeBuildError,
    KdTreeBuildParams, BRANCH_SENTINEL,
};

mod kd_tree;
