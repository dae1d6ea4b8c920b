use crate::math::{Point, Real};
use crate::utils::triangle_cross;
use alloc::vec::Vec;

/// Triangles whose squared normal length is at or below this value are degenerate.
pub const DEGENERATE_TRIANGLE_EPSILON: f64 = 1.0e-10;

/// The maximum number of triangles a clustered mesh can address.
pub const MAX_TRIANGLE_COUNT: usize = 1 << 24;

/// Indicates that a set of triangles cannot be turned into a clustered mesh.
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum TriangleValidationError {
    /// A clustered mesh must contain at least one vertex and one triangle.
    #[error("a clustered mesh must contain at least one vertex and one triangle.")]
    EmptyMesh,
    /// The mesh has more triangles than unit references can address.
    #[error("the mesh has {0} triangles, more than the supported maximum of 2^24.")]
    TooManyTriangles(usize),
    /// A triangle references a vertex that does not exist.
    #[error("the triangle {triangle} references the vertex {vertex} but the mesh only has {num_vertices} vertices.")]
    VertexIndexOutOfBounds {
        /// The offending triangle.
        triangle: u32,
        /// The out-of-bounds vertex index.
        vertex: u32,
        /// The number of vertices of the mesh.
        num_vertices: u32,
    },
    /// Every triangle of the mesh has a zero area.
    #[error("all the {0} triangles of the mesh are degenerate.")]
    AllTrianglesDegenerate(usize),
}

/// Does the triangle `tri` have a non-zero area?
#[inline]
pub fn is_triangle_valid(vertices: &[Point<Real>], tri: &[u32; 3]) -> bool {
    let normal = triangle_cross(
        &vertices[tri[0] as usize],
        &vertices[tri[1] as usize],
        &vertices[tri[2] as usize],
    );
    normal.norm_squared() > DEGENERATE_TRIANGLE_EPSILON
}

/// Checks that `triangles` can be evaluated against `vertices` at all.
pub fn check_triangle_indices(
    vertices: &[Point<Real>],
    triangles: &[[u32; 3]],
) -> Result<(), TriangleValidationError> {
    if vertices.is_empty() || triangles.is_empty() {
        return Err(TriangleValidationError::EmptyMesh);
    }

    if triangles.len() > MAX_TRIANGLE_COUNT {
        return Err(TriangleValidationError::TooManyTriangles(triangles.len()));
    }

    for (tid, tri) in triangles.iter().enumerate() {
        if let Some(vertex) = tri.iter().find(|vid| **vid as usize >= vertices.len()) {
            return Err(TriangleValidationError::VertexIndexOutOfBounds {
                triangle: tid as u32,
                vertex: *vertex,
                num_vertices: vertices.len() as u32,
            });
        }
    }

    Ok(())
}

/// Computes the indices, in `triangles`, of every triangle with a non-zero area.
///
/// The relative order of the triangles is preserved.
pub fn valid_triangle_ids(
    vertices: &[Point<Real>],
    triangles: &[[u32; 3]],
) -> Result<Vec<u32>, TriangleValidationError> {
    check_triangle_indices(vertices, triangles)?;

    let valid: Vec<u32> = triangles
        .iter()
        .enumerate()
        .filter(|(_, tri)| is_triangle_valid(vertices, tri))
        .map(|(tid, _)| tid as u32)
        .collect();

    if valid.is_empty() {
        return Err(TriangleValidationError::AllTrianglesDegenerate(
            triangles.len(),
        ));
    }

    if valid.len() != triangles.len() {
        log::debug!(
            "Dropped {} degenerate triangles out of {}.",
            triangles.len() - valid.len(),
            triangles.len()
        );
    }

    Ok(valid)
}

/// Removes every zero-area triangle from `triangles`.
///
/// Fails if the mesh is empty, if an index is out of bounds, or if no triangle survives.
pub fn validate_triangles(
    vertices: &[Point<Real>],
    triangles: &[[u32; 3]],
) -> Result<Vec<[u32; 3]>, TriangleValidationError> {
    Ok(valid_triangle_ids(vertices, triangles)?
        .into_iter()
        .map(|tid| triangles[tid as usize])
        .collect())
}
