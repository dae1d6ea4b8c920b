use crate::math::{Point, Real};

/// A volume enclosing a group of triangles.
///
/// KD-tree nodes grow their volume by merging the volumes of their entries, starting from an
/// empty volume.
pub trait BoundingVolume {
    /// The center of this volume.
    fn center(&self) -> Point<Real>;

    /// Does this volume enclose `other` entirely?
    fn contains(&self, other: &Self) -> bool;

    /// Grows this volume in-place so it also encloses `other`.
    fn merge(&mut self, other: &Self);

    /// The smallest volume enclosing both `self` and `other`.
    fn merged(&self, other: &Self) -> Self;
}
