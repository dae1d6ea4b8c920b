//! Axis Aligned Bounding Box.

use crate::bounding_volume::BoundingVolume;
use crate::math::{Point, Real, Vector, DIM};
use na;

/// An Axis-Aligned Bounding Box (AABB).
///
/// An AABB is defined by its minimum and maximum corners. It is the bounding volume used by
/// every stage of the clustered mesh pipeline: KD-tree entries, KD-tree nodes and the mesh
/// bounds written into the serialized headers.
///
/// # Inverted boxes
///
/// An AABB with `mins > maxs` on some axis is *inverted*. [`Aabb::new_invalid`] creates the
/// fully inverted box used as the neutral element of [`BoundingVolume::merge`], and the KD-tree
/// builder assigns it to the empty side of an empty-leaf split. Inverted boxes are never
/// clamped: their [`Aabb::surface_area`] is a huge positive number, which keeps them from ever
/// looking attractive to a cost model.
///
/// # Example
///
/// ```rust
/// use clustered_mesh::bounding_volume::Aabb;
/// use clustered_mesh::math::Point;
///
/// let aabb = Aabb::from_points([
///     Point::new(1.0, 2.0, 3.0),
///     Point::new(-1.0, 4.0, 2.0),
///     Point::new(0.0, 0.0, 5.0),
/// ]);
///
/// assert_eq!(aabb.mins, Point::new(-1.0, 0.0, 2.0));
/// assert_eq!(aabb.maxs, Point::new(1.0, 4.0, 5.0));
/// assert_eq!(aabb.surface_area(), 2.0 * (2.0 * 4.0 + 4.0 * 3.0 + 3.0 * 2.0));
/// ```
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Debug, PartialEq, Copy, Clone)]
#[repr(C)]
pub struct Aabb {
    /// The point with minimum coordinates.
    pub mins: Point<Real>,
    /// The point with maximum coordinates.
    pub maxs: Point<Real>,
}

impl Aabb {
    /// Creates a new AABB from its minimum and maximum corners.
    #[inline]
    pub fn new(mins: Point<Real>, maxs: Point<Real>) -> Aabb {
        Aabb { mins, maxs }
    }

    /// Creates an invalid AABB with inverted bounds.
    ///
    /// The resulting AABB has `mins` set to maximum values and `maxs` set to
    /// minimum values. This is the initial value of AABB merging loops.
    #[inline]
    pub fn new_invalid() -> Self {
        Self::new(
            Vector::repeat(Real::MAX).into(),
            Vector::repeat(-Real::MAX).into(),
        )
    }

    /// Creates a new AABB that tightly encloses a set of points.
    pub fn from_points<I>(pts: I) -> Self
    where
        I: IntoIterator<Item = Point<Real>>,
    {
        let mut result = Self::new_invalid();
        for pt in pts {
            result.take_point(pt);
        }
        result
    }

    /// Creates a new AABB that tightly encloses a set of points (references).
    pub fn from_points_ref<'a, I>(pts: I) -> Self
    where
        I: IntoIterator<Item = &'a Point<Real>>,
    {
        Self::from_points(pts.into_iter().copied())
    }

    /// The extents of this `Aabb`, computed in double precision.
    ///
    /// This never overflows to infinity, even for inverted boxes.
    #[inline]
    pub fn extents_f64(&self) -> Vector<f64> {
        Vector::from_fn(|i, _| self.maxs[i] as f64 - self.mins[i] as f64)
    }

    /// The surface area of this `Aabb`, in double precision.
    ///
    /// Inverted boxes are not clamped: the products of their negative extents are positive, so
    /// an empty box reports an enormous area.
    #[inline]
    pub fn surface_area(&self) -> f64 {
        let e = self.extents_f64();
        2.0 * (e.x * e.y + e.y * e.z + e.z * e.x)
    }

    /// Is `mins > maxs` on at least one axis?
    #[inline]
    pub fn is_inverted(&self) -> bool {
        (0..DIM).any(|i| self.mins[i] > self.maxs[i])
    }

    /// Enlarges this `Aabb` so it also contains the point `pt`.
    pub fn take_point(&mut self, pt: Point<Real>) {
        self.mins = self.mins.coords.inf(&pt.coords).into();
        self.maxs = self.maxs.coords.sup(&pt.coords).into();
    }

    /// A copy of `self` with its minimum on `axis` replaced by `value`.
    #[inline]
    #[must_use]
    pub fn with_min(mut self, axis: usize, value: Real) -> Self {
        self.mins[axis] = value;
        self
    }

    /// A copy of `self` with its maximum on `axis` replaced by `value`.
    #[inline]
    #[must_use]
    pub fn with_max(mut self, axis: usize, value: Real) -> Self {
        self.maxs[axis] = value;
        self
    }
}

impl BoundingVolume for Aabb {
    #[inline]
    fn center(&self) -> Point<Real> {
        na::center(&self.mins, &self.maxs)
    }

    #[inline]
    fn contains(&self, other: &Aabb) -> bool {
        na::partial_le(&self.mins, &other.mins) && na::partial_ge(&self.maxs, &other.maxs)
    }

    #[inline]
    fn merge(&mut self, other: &Aabb) {
        self.mins = self.mins.inf(&other.mins);
        self.maxs = self.maxs.sup(&other.maxs);
    }

    #[inline]
    fn merged(&self, other: &Aabb) -> Aabb {
        Aabb {
            mins: self.mins.inf(&other.mins),
            maxs: self.maxs.sup(&other.maxs),
        }
    }
}

#[cfg(test)]
mod test {
    use super::Aabb;
    use crate::bounding_volume::BoundingVolume;
    use crate::math::Point;

    #[test]
    fn invalid_aabb_is_merge_neutral() {
        let aabb = Aabb::new(Point::new(-1.0, 0.0, 2.0), Point::new(1.0, 2.0, 3.0));
        assert_eq!(Aabb::new_invalid().merged(&aabb), aabb);
        assert!(Aabb::new_invalid().is_inverted());
        assert!(!aabb.is_inverted());
    }

    #[test]
    fn inverted_area_is_not_clamped() {
        let area = Aabb::new_invalid().surface_area();
        assert!(area.is_finite());
        assert!(area > 1.0e70);
    }

    #[test]
    fn with_min_max_replace_one_face() {
        let aabb = Aabb::new(Point::origin(), Point::new(4.0, 4.0, 4.0));
        let reduced = aabb.with_min(1, 3.0).with_max(2, 1.0);
        assert_eq!(reduced.mins, Point::new(0.0, 3.0, 0.0));
        assert_eq!(reduced.maxs, Point::new(4.0, 4.0, 1.0));
        assert_eq!(reduced.surface_area(), 2.0 * (4.0 * 1.0 + 1.0 * 1.0 + 1.0 * 4.0));
    }
}
