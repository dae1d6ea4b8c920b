use crate::math::{Point, Real, Vector};
use crate::utils::{to_f64, unit_triangle_normal};
use alloc::vec::Vec;
use smallvec::SmallVec;

/// Neighbor index of an edge that isn't shared with any other triangle.
pub const NO_NEIGHBOR: u32 = u32::MAX;

/// The edge cosine given to unmatched edges.
pub const UNMATCHED_EDGE_COSINE: f32 = 1.0;

/// The triangles incident to each vertex of a mesh.
///
/// Triangles are listed in increasing index order for every vertex, so iterating through this
/// map is deterministic.
#[derive(Clone, Debug, Default)]
pub struct VertexTriangleMap {
    incident: Vec<SmallVec<[u32; 8]>>,
}

impl VertexTriangleMap {
    /// Builds the vertex to triangle map of a mesh with `num_vertices` vertices.
    pub fn new(num_vertices: usize, triangles: &[[u32; 3]]) -> Self {
        let mut incident = alloc::vec![SmallVec::new(); num_vertices];

        for (tid, tri) in triangles.iter().enumerate() {
            for (k, vid) in tri.iter().enumerate() {
                // A triangle repeating a vertex is only listed once.
                if !tri[..k].contains(vid) {
                    incident[*vid as usize].push(tid as u32);
                }
            }
        }

        Self { incident }
    }

    /// The triangles incident to the vertex `vid`.
    #[inline]
    pub fn incident_triangles(&self, vid: u32) -> &[u32] {
        &self.incident[vid as usize]
    }

    /// The number of vertices covered by this map.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.incident.len()
    }
}

/// The adjacency information of every edge of a triangle mesh.
///
/// The edge `k` of a triangle `[a, b, c]` goes from its vertex `k` to its vertex `(k + 1) % 3`.
/// Each edge is matched with at most one edge of another triangle running in the opposite
/// direction.
#[derive(Clone, Debug, PartialEq)]
pub struct TriangleNeighbors {
    neighbors: Vec<[u32; 3]>,
    neighbor_edges: Vec<[u8; 3]>,
    edge_cosines: Vec<[f32; 3]>,
}

impl TriangleNeighbors {
    fn new(num_triangles: usize) -> Self {
        Self {
            neighbors: alloc::vec![[NO_NEIGHBOR; 3]; num_triangles],
            neighbor_edges: alloc::vec![[0; 3]; num_triangles],
            edge_cosines: alloc::vec![[UNMATCHED_EDGE_COSINE; 3]; num_triangles],
        }
    }

    /// The number of triangles described by `self`.
    #[inline]
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    /// Is this an adjacency set of zero triangles?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// The triangle sharing the edge `edge` of the triangle `tid`, if any.
    #[inline]
    pub fn neighbor(&self, tid: u32, edge: usize) -> Option<u32> {
        let neighbor = self.neighbors[tid as usize][edge];
        (neighbor != NO_NEIGHBOR).then_some(neighbor)
    }

    /// The neighbor and the matching edge index on that neighbor, if any.
    #[inline]
    pub fn mate(&self, tid: u32, edge: usize) -> Option<(u32, usize)> {
        self.neighbor(tid, edge)
            .map(|n| (n, self.neighbor_edges[tid as usize][edge] as usize))
    }

    /// The extended edge cosine of the edge `edge` of the triangle `tid`.
    ///
    /// Lies in `[-1, 1)` for convex edges and `[1, 3]` for flat or concave edges. Unmatched
    /// edges report [`UNMATCHED_EDGE_COSINE`].
    #[inline]
    pub fn edge_cosine(&self, tid: u32, edge: usize) -> f32 {
        self.edge_cosines[tid as usize][edge]
    }

    /// The neighbor triangles of every triangle, [`NO_NEIGHBOR`] standing for a free edge.
    #[inline]
    pub fn neighbors(&self) -> &[[u32; 3]] {
        &self.neighbors
    }

    /// The edge cosines of every triangle.
    #[inline]
    pub fn edge_cosines(&self) -> &[[f32; 3]] {
        &self.edge_cosines
    }

    fn link(&mut self, t1: u32, e1: usize, t2: u32, e2: usize, cosine: f32) {
        self.neighbors[t1 as usize][e1] = t2;
        self.neighbor_edges[t1 as usize][e1] = e2 as u8;
        self.edge_cosines[t1 as usize][e1] = cosine;
        self.neighbors[t2 as usize][e2] = t1;
        self.neighbor_edges[t2 as usize][e2] = e1 as u8;
        self.edge_cosines[t2 as usize][e2] = cosine;
    }

    fn orphan(&mut self, tid: u32, edge: usize) {
        self.neighbors[tid as usize][edge] = NO_NEIGHBOR;
        self.neighbor_edges[tid as usize][edge] = 0;
        self.edge_cosines[tid as usize][edge] = UNMATCHED_EDGE_COSINE;
    }
}

/// Computes the extended cosine of the edge `edge_start → edge_end` of a triangle with unit
/// normal `n1`, shared with a triangle of unit normal `n2`.
///
/// The raw cosine `n1 · n2` is kept when the edge is convex, and remapped to `2 - n1 · n2` when
/// it is concave. The result is monotonic in the dihedral angle over `[-1, 3]`: larger values
/// are flatter, then more concave.
pub fn extended_edge_cosine(
    edge_start: &Point<Real>,
    edge_end: &Point<Real>,
    n1: &Vector<f64>,
    n2: &Vector<f64>,
) -> f32 {
    let edge_dir = to_f64(edge_end) - to_f64(edge_start);
    let cosine = n1.dot(n2).clamp(-1.0, 1.0);
    let torsion = edge_dir.dot(&n1.cross(n2));

    let extended = if torsion >= 0.0 { cosine } else { 2.0 - cosine };
    extended as f32
}

/// The three edge vertices of `tri`: the edge `k` goes from `tri[k]` to `tri[(k + 1) % 3]`.
#[inline]
pub(crate) fn edge_vertices(tri: &[u32; 3], edge: usize) -> (u32, u32) {
    (tri[edge], tri[(edge + 1) % 3])
}

struct NeighborFinder<'a> {
    vertices: &'a [Point<Real>],
    triangles: &'a [[u32; 3]],
    normals: Vec<Vector<f64>>,
    result: TriangleNeighbors,
}

impl NeighborFinder<'_> {
    fn cosine(&self, t1: u32, e1: usize, t2: u32) -> f32 {
        let (a, b) = edge_vertices(&self.triangles[t1 as usize], e1);
        extended_edge_cosine(
            &self.vertices[a as usize],
            &self.vertices[b as usize],
            &self.normals[t1 as usize],
            &self.normals[t2 as usize],
        )
    }

    fn mate_edges(&mut self, t1: u32, e1: usize, t2: u32, e2: usize) {
        let cosine = self.cosine(t1, e1, t2);
        let mate1 = self.result.mate(t1, e1);
        let mate2 = self.result.mate(t2, e2);

        match (mate1, mate2) {
            (None, None) => self.result.link(t1, e1, t2, e2, cosine),
            (Some((a, ea)), None) => {
                if cosine > self.result.edge_cosine(t1, e1) {
                    self.result.orphan(a, ea);
                    self.result.link(t1, e1, t2, e2, cosine);
                }
            }
            (None, Some((b, eb))) => {
                if cosine > self.result.edge_cosine(t2, e2) {
                    self.result.orphan(b, eb);
                    self.result.link(t1, e1, t2, e2, cosine);
                }
            }
            (Some((a, ea)), Some((b, eb))) => {
                // Swapping (t1, a) + (t2, b) for (t1, t2) + (a, b) must not pair a triangle
                // with itself, and has to improve both sides.
                if a == b || a == t2 || b == t1 {
                    return;
                }

                if cosine > self.result.edge_cosine(t1, e1)
                    && cosine > self.result.edge_cosine(t2, e2)
                {
                    let cosine_ab = self.cosine(a, ea, b);
                    self.result.link(t1, e1, t2, e2, cosine);
                    self.result.link(a, ea, b, eb, cosine_ab);
                }
            }
        }
    }
}

/// Finds, for every edge of every triangle, the triangle sharing that edge with an opposite
/// orientation.
///
/// When more than two triangles share an edge, the pairing with the largest extended edge
/// cosine (see [`extended_edge_cosine`]) wins. This never fails: edges without a partner are
/// left unmatched.
///
/// All the triangles are expected to have a non-zero area (see
/// [`validate_triangles`](crate::mesh::validate_triangles)).
pub fn find_triangle_neighbors(
    vertices: &[Point<Real>],
    triangles: &[[u32; 3]],
    vertex_triangles: &VertexTriangleMap,
) -> TriangleNeighbors {
    let normals = triangles
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

    let mut finder = NeighborFinder {
        vertices,
        triangles,
        normals,
        result: TriangleNeighbors::new(triangles.len()),
    };

    for (t1, tri1) in triangles.iter().enumerate() {
        let t1 = t1 as u32;

        for e1 in 0..3 {
            let (v0, v1) = edge_vertices(tri1, e1);

            for &t2 in vertex_triangles.incident_triangles(v0) {
                if t2 <= t1 {
                    continue;
                }

                let tri2 = &triangles[t2 as usize];
                if let Some(e2) = (0..3).find(|e2| edge_vertices(tri2, *e2) == (v1, v0)) {
                    finder.mate_edges(t1, e1, t2, e2);
                }
            }
        }
    }

    finder.result
}

#[cfg(test)]
mod test {
    use super::{
        find_triangle_neighbors, TriangleNeighbors, VertexTriangleMap, UNMATCHED_EDGE_COSINE,
    };
    use crate::math::{Point, Real};
    use alloc::vec;
    use alloc::vec::Vec;
    use approx::assert_relative_eq;

    fn neighbors_of(vertices: &[Point<f32>], triangles: &[[u32; 3]]) -> TriangleNeighbors {
        let map = VertexTriangleMap::new(vertices.len(), triangles);
        find_triangle_neighbors(vertices, triangles, &map)
    }

    #[test]
    fn convex_and_concave_edges() {
        let vertices = vec![
            Point::new(0.0, 0.0, 0.0),
            Point::new(0.0, 0.0, 1.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(-1.0, -1.0, 0.0),
            Point::new(-1.0, 1.0, 0.0),
        ];
        // Floor triangle (normal +y) and a roof-like neighbor folded downward: convex.
        let convex = neighbors_of(&vertices, &[[0, 1, 2], [1, 0, 3]]);
        assert_eq!(convex.neighbor(0, 0), Some(1));
        assert_eq!(convex.neighbor(1, 0), Some(0));
        assert!(convex.edge_cosine(0, 0) < 1.0);
        assert_eq!(convex.edge_cosine(0, 0), convex.edge_cosine(1, 0));

        // Same but folded upward: concave.
        let concave = neighbors_of(&vertices, &[[0, 1, 2], [1, 0, 4]]);
        assert!(concave.edge_cosine(0, 0) > 1.0);
        assert!(concave.edge_cosine(0, 0) <= 3.0);
        assert_eq!(concave.neighbor(0, 1), None);
        assert_eq!(concave.edge_cosine(0, 1), UNMATCHED_EDGE_COSINE);
    }

    #[test]
    fn non_manifold_edge_keeps_largest_cosine() {
        let vertices = vec![
            Point::new(0.0, 0.0, 0.0),
            Point::new(0.0, 0.0, 1.0),
            Point::new(1.0, 0.0, 0.0),
            // Flat continuation of the floor.
            Point::new(-1.0, 0.0, 0.0),
            // Wall going up: concave with the floor.
            Point::new(0.0, 1.0, 0.5),
        ];

        // The wall is met first and keeps the edge against the flat continuation.
        let neighbors = neighbors_of(&vertices, &[[0, 1, 2], [1, 0, 4], [1, 0, 3]]);
        assert_eq!(neighbors.neighbor(0, 0), Some(1));
        assert_eq!(neighbors.mate(1, 0), Some((0, 0)));
        assert_relative_eq!(neighbors.edge_cosine(0, 0), 2.0);
        assert_eq!(neighbors.neighbor(2, 0), None);
        assert_eq!(neighbors.edge_cosine(2, 0), UNMATCHED_EDGE_COSINE);

        // The flat continuation is met first, then replaced by the wall.
        let neighbors = neighbors_of(&vertices, &[[0, 1, 2], [1, 0, 3], [1, 0, 4]]);
        assert_eq!(neighbors.neighbor(0, 0), Some(2));
        assert_eq!(neighbors.neighbor(2, 0), Some(0));
        assert_eq!(neighbors.neighbor(1, 0), None);
        assert_eq!(neighbors.edge_cosine(1, 0), UNMATCHED_EDGE_COSINE);
    }

    #[test]
    fn neighbor_search_is_deterministic() {
        let mut rng = oorandom::Rand32::new(42);
        let vertices: Vec<_> = (0..30)
            .map(|_| Point::new(rng.rand_float(), rng.rand_float(), rng.rand_float()))
            .collect();
        let triangles: Vec<_> = (0..60)
            .map(|_| {
                let a = rng.rand_range(0..30);
                [a, (a + 1 + rng.rand_range(0..14)) % 30, (a + 15 + rng.rand_range(0..14)) % 30]
            })
            .collect();

        let first = neighbors_of(&vertices, &triangles);
        let second = neighbors_of(&vertices, &triangles);
        assert_eq!(first, second);

        assert_symmetric(&first);
    }

    fn assert_symmetric(neighbors: &TriangleNeighbors) {
        for tid in 0..neighbors.len() as u32 {
            for edge in 0..3 {
                if let Some((mate, mate_edge)) = neighbors.mate(tid, edge) {
                    assert_eq!(neighbors.mate(mate, mate_edge), Some((tid, edge)));
                }
            }
        }
    }

    /// Four triangles around the edge `(0, 0, 0) → (0, 0, 1)`. The first two run along the
    /// edge, the last two against it. Their third vertex is at the given angle (in degrees)
    /// around the edge.
    fn edge_fan(angles: [Real; 4]) -> (Vec<Point<Real>>, Vec<[u32; 3]>) {
        let mut vertices = vec![Point::new(0.0, 0.0, 0.0), Point::new(0.0, 0.0, 1.0)];
        vertices.extend(angles.iter().map(|angle| {
            let (sin, cos) = angle.to_radians().sin_cos();
            Point::new(cos, sin, 0.5)
        }));
        let triangles = vec![[0, 1, 2], [0, 1, 3], [1, 0, 4], [1, 0, 5]];
        (vertices, triangles)
    }

    #[test]
    fn non_manifold_edge_swaps_pairs_improving_both_sides() {
        // 0 first pairs with 2, then trades it for 3. 1 picks up 2. Then (1, 3) beats both
        // (1, 2) and (0, 3), so the pairs become (1, 3) and (0, 2).
        let (vertices, triangles) = edge_fan([0.0, 20.0, -150.0, 170.0]);
        let neighbors = neighbors_of(&vertices, &triangles);
        assert_eq!(neighbors.mate(1, 0), Some((3, 0)));
        assert_eq!(neighbors.mate(0, 0), Some((2, 0)));
        assert!(neighbors.edge_cosine(1, 0) > 1.0);
        assert!(neighbors.edge_cosine(0, 0) < 1.0);
        assert_eq!(neighbors.edge_cosine(0, 0), neighbors.edge_cosine(2, 0));
        assert_symmetric(&neighbors);

        // (1, 3) still beats (1, 2) but not (0, 3): nothing changes.
        let (vertices, triangles) = edge_fan([0.0, -5.0, -150.0, 170.0]);
        let neighbors = neighbors_of(&vertices, &triangles);
        assert_eq!(neighbors.mate(0, 0), Some((3, 0)));
        assert_eq!(neighbors.mate(1, 0), Some((2, 0)));
        assert!(neighbors.edge_cosine(0, 0) > neighbors.edge_cosine(1, 0));
        assert_symmetric(&neighbors);
    }

    #[test]
    fn swap_never_pairs_a_triangle_with_itself() {
        let vertices = vec![
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(0.5, 0.0, 1.0),
            Point::new(0.5, 0.0, -1.0),
        ];
        // The sliver holds both directions of the edge (0, 1), so it mates with both flat
        // triangles. Their own flat pairing would leave the sliver paired with itself.
        let triangles = [[0, 1, 0], [1, 0, 2], [0, 1, 3]];
        let neighbors = neighbors_of(&vertices, &triangles);

        assert_eq!(neighbors.mate(1, 0), Some((0, 0)));
        assert_eq!(neighbors.mate(2, 0), Some((0, 1)));
        assert_eq!(neighbors.neighbor(0, 2), None);
        assert_symmetric(&neighbors);
    }
}
