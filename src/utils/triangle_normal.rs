use crate::math::{Point, Real, Vector};

/// Widens a single precision point to double precision.
#[inline]
pub(crate) fn to_f64(pt: &Point<Real>) -> Vector<f64> {
    Vector::new(pt.x as f64, pt.y as f64, pt.z as f64)
}

/// The (non-normalized) cross product `(b - a) × (c - a)` of a counter-clock-wise triangle,
/// computed in double precision.
#[inline]
pub(crate) fn triangle_cross(a: &Point<Real>, b: &Point<Real>, c: &Point<Real>) -> Vector<f64> {
    let a = to_f64(a);
    (to_f64(b) - a).cross(&(to_f64(c) - a))
}

/// Computes the unit normal of a counter-clock-wise triangle.
///
/// Returns `None` if the triangle is degenerate.
#[inline]
pub(crate) fn unit_triangle_normal(
    a: &Point<Real>,
    b: &Point<Real>,
    c: &Point<Real>,
) -> Option<Vector<f64>> {
    triangle_cross(a, b, c).try_normalize(0.0)
}
