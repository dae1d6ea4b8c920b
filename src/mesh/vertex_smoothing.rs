use crate::math::{Point, Real, Vector};
use crate::mesh::{EdgeCode, VertexTriangleMap};
use crate::utils::{to_f64, unit_triangle_normal};
use alloc::vec::Vec;

/// Incident triangles whose normals agree up to this cosine tolerance are coplanar.
pub const COPLANAR_COSINE_TOLERANCE: f64 = 0.01;
/// An edge dipping below a neighboring plane by more than this cosine makes the vertex concave.
pub const CONCAVE_COSINE_TOLERANCE: f64 = 0.15;
/// An edge within this cosine of a neighboring plane lies in that plane.
pub const IN_PLANE_COSINE_TOLERANCE: f64 = 0.01;
/// Two edges whose directions are opposite up to this cosine tolerance are collinear.
pub const HALF_SPACE_TOLERANCE: f64 = 0.05;

fn other_vertices(tri: &[u32; 3], vid: u32) -> impl Iterator<Item = u32> + '_ {
    tri.iter().copied().filter(move |v| *v != vid)
}

/// Decides whether collisions against the vertex `vid` can be left to its edges and faces.
///
/// A vertex is a non-feature vertex if all its incident triangles are coplanar, if it sits at
/// the bottom of a concave fold, or if it lies on a straight continuation of one of its edges
/// inside a plane.
pub fn is_non_feature_vertex(
    vid: u32,
    vertices: &[Point<Real>],
    triangles: &[[u32; 3]],
    normals: &[Vector<f64>],
    vertex_triangles: &VertexTriangleMap,
) -> bool {
    let incident = vertex_triangles.incident_triangles(vid);
    let Some(first) = incident.first() else {
        return false;
    };

    let n0 = normals[*first as usize];
    if incident
        .iter()
        .all(|tid| normals[*tid as usize].dot(&n0) >= 1.0 - COPLANAR_COSINE_TOLERANCE)
    {
        return true;
    }

    let center = to_f64(&vertices[vid as usize]);
    let direction_from_center = |other: u32| -> Option<Vector<f64>> {
        (to_f64(&vertices[other as usize]) - center).try_normalize(0.0)
    };

    for &ti in incident {
        let ni = normals[ti as usize];
        let tri_i = &triangles[ti as usize];

        for &tj in incident {
            if tj == ti {
                continue;
            }

            for other in other_vertices(&triangles[tj as usize], vid) {
                let Some(outward) = direction_from_center(other) else {
                    continue;
                };

                // Direction of the edge of `tj` running into the shared vertex.
                let inward_dot = -outward.dot(&ni);

                if inward_dot < -CONCAVE_COSINE_TOLERANCE {
                    return true;
                }

                if inward_dot.abs() <= IN_PLANE_COSINE_TOLERANCE {
                    let continues_edge = other_vertices(tri_i, vid)
                        .filter_map(direction_from_center)
                        .any(|edge| outward.dot(&edge) <= -(1.0 - HALF_SPACE_TOLERANCE));

                    if continues_edge {
                        return true;
                    }
                }
            }
        }
    }

    false
}

/// Disables vertex collisions on every non-feature vertex of the mesh.
///
/// The [`EdgeCode::VERTEX_DISABLED`] flag is added to the edge code `k` of every triangle whose
/// vertex `k` is a non-feature vertex (see [`is_non_feature_vertex`]). Returns the number of
/// disabled vertices. Neighbor information is left untouched.
pub fn smooth_vertices(
    vertices: &[Point<Real>],
    triangles: &[[u32; 3]],
    vertex_triangles: &VertexTriangleMap,
    edge_codes: &mut [[EdgeCode; 3]],
) -> usize {
    let normals: Vec<_> = triangles
        .iter()
        .map(|tri| {
            unit_triangle_normal(
                &vertices[tri[0] as usize],
                &vertices[tri[1] as usize],
                &vertices[tri[2] as usize],
            )
            .unwrap_or_else(Vector::zeros)
        })
        .collect();

    let mut num_disabled = 0;

    for vid in 0..vertex_triangles.num_vertices() as u32 {
        if !is_non_feature_vertex(vid, vertices, triangles, &normals, vertex_triangles) {
            continue;
        }

        num_disabled += 1;

        for &tid in vertex_triangles.incident_triangles(vid) {
            for (k, v) in triangles[tid as usize].iter().enumerate() {
                if *v == vid {
                    edge_codes[tid as usize][k] |= EdgeCode::VERTEX_DISABLED;
                }
            }
        }
    }

    log::debug!(
        "Disabled vertex collisions on {} of {} vertices.",
        num_disabled,
        vertex_triangles.num_vertices()
    );

    num_disabled
}
