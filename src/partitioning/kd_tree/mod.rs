pub use kd_tree_build::KdTreeBuildError;
pub use kd_tree_runtime::{KdChildRef, KdRuntimeNode, BRANCH_SENTINEL};
pub use kd_tree_split::KdSplitKind;
pub use kd_tree_tree::{KdBuildNode, KdEntry, KdTree, KdTreeBuildParams};

mod kd_tree_build;
mod kd_tree_runtime;
mod kd_tree_split;
mod kd_tree_tree;
mod kd_tree_validation;
