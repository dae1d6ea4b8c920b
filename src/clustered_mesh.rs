use crate::bounding_volume::{Aabb, BoundingVolume};
use crate::cluster::{
    build_clusters, resolve_compression_mode, select_compression_mode, ClusterError,
    ClusterLayout, CompressionMode, UnitCluster,
};
use crate::math::{Point, Real};
use crate::mesh::{
    find_triangle_neighbors, generate_edge_codes, smooth_vertices, valid_triangle_ids, EdgeCode,
    TriangleNeighbors, TriangleValidationError, VertexTriangleMap,
};
use crate::partitioning::{KdEntry, KdRuntimeNode, KdTree, KdTreeBuildError, KdTreeBuildParams};
use crate::serialization::{
    serialize_clustered_mesh, ClusterMeshData, ClusteredMeshBlob, SerializationError,
};
use alloc::vec::Vec;

/// Indicates that a clustered mesh cannot be built from the given inputs.
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq)]
pub enum ClusteredMeshBuilderError {
    /// The triangles are unusable.
    #[error(transparent)]
    InvalidTriangles(#[from] TriangleValidationError),
    /// The vertex compression granularity must be finite and positive.
    #[error("the vertex compression granularity must be finite and positive, got {0}.")]
    InvalidGranularity(Real),
    /// Surface ids must be given for every triangle.
    #[error("{surface_ids} surface ids were given for {triangles} triangles.")]
    SurfaceIdCountMismatch {
        /// Number of surface ids.
        surface_ids: usize,
        /// Number of triangles.
        triangles: usize,
    },
    /// The KD-tree build failed a consistency check.
    #[error(transparent)]
    KdTree(#[from] KdTreeBuildError),
    /// Clustering failed a consistency check.
    #[error(transparent)]
    Cluster(#[from] ClusterError),
}

/// Controls the optional stages of a clustered mesh build.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[repr(C)]
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ClusteredMeshFlags(u8);

bitflags::bitflags! {
    impl ClusteredMeshFlags: u8 {
        /// If set, collisions are disabled on vertices that can't be hit before their edges
        /// or faces.
        const VERTEX_SMOOTHING = 1;
        /// If set, cluster vertices are stored as integers on a lattice whenever possible.
        const COMPRESS_VERTICES = 1 << 1;
    }
}

impl Default for ClusteredMeshFlags {
    fn default() -> Self {
        ClusteredMeshFlags::COMPRESS_VERTICES
    }
}

/// Parameters of a clustered mesh build.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ClusteredMeshParams {
    /// The step of the integer lattice compressed vertices are snapped to.
    pub granularity: Real,
    /// The optional stages to run.
    pub flags: ClusteredMeshFlags,
    /// The KD-tree build parameters.
    pub kd_tree: KdTreeBuildParams,
}

impl Default for ClusteredMeshParams {
    fn default() -> Self {
        Self {
            granularity: 0.001,
            flags: ClusteredMeshFlags::default(),
            kd_tree: KdTreeBuildParams::default(),
        }
    }
}

/// Counts describing a built clustered mesh.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusteredMeshStatistics {
    /// Number of valid triangles (units).
    pub num_triangles: usize,
    /// Number of clusters.
    pub num_clusters: usize,
    /// Number of KD-tree branch nodes.
    pub num_branch_nodes: usize,
    /// Number of KD-tree leaves.
    pub num_leaves: usize,
    /// Number of KD-tree leaves without any triangle.
    pub num_empty_leaves: usize,
    /// Number of vertices disabled by vertex smoothing.
    pub num_disabled_vertices: usize,
    /// Number of clusters storing plain `f32` vertices.
    pub num_uncompressed_clusters: usize,
    /// Number of clusters storing 16-bit vertices.
    pub num_int16_clusters: usize,
    /// Number of clusters storing 32-bit vertices.
    pub num_int32_clusters: usize,
}

/// Builds a [`ClusteredMesh`] from a vertex buffer and an index buffer.
#[derive(Clone, Debug)]
pub struct ClusteredMeshBuilder {
    vertices: Vec<Point<Real>>,
    triangles: Vec<[u32; 3]>,
    surface_ids: Option<Vec<u16>>,
    params: ClusteredMeshParams,
}

impl ClusteredMeshBuilder {
    /// Starts the build of a clustered mesh with default parameters and surface ids set to `0`.
    pub fn new(vertices: Vec<Point<Real>>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            triangles,
            surface_ids: None,
            params: ClusteredMeshParams::default(),
        }
    }

    /// Sets the surface id of every triangle.
    pub fn with_surface_ids(mut self, surface_ids: Vec<u16>) -> Self {
        self.surface_ids = Some(surface_ids);
        self
    }

    /// Sets the build parameters.
    pub fn with_params(mut self, params: ClusteredMeshParams) -> Self {
        self.params = params;
        self
    }

    /// Runs every stage of the build.
    pub fn build(self) -> Result<ClusteredMesh, ClusteredMeshBuilderError> {
        let Self {
            vertices,
            triangles,
            surface_ids,
            params,
        } = self;

        if !params.granularity.is_finite() || params.granularity <= 0.0 {
            return Err(ClusteredMeshBuilderError::InvalidGranularity(
                params.granularity,
            ));
        }

        if let Some(ids) = &surface_ids {
            if ids.len() != triangles.len() {
                return Err(ClusteredMeshBuilderError::SurfaceIdCountMismatch {
                    surface_ids: ids.len(),
                    triangles: triangles.len(),
                });
            }
        }

        let valid_ids = valid_triangle_ids(&vertices, &triangles)?;
        let surface_ids: Vec<u16> = match surface_ids {
            Some(ids) => valid_ids.iter().map(|tid| ids[*tid as usize]).collect(),
            None => alloc::vec![0; valid_ids.len()],
        };
        let triangles: Vec<[u32; 3]> = valid_ids
            .iter()
            .map(|tid| triangles[*tid as usize])
            .collect();

        let vertex_triangles = VertexTriangleMap::new(vertices.len(), &triangles);
        let neighbors = find_triangle_neighbors(&vertices, &triangles, &vertex_triangles);
        let mut edge_codes = generate_edge_codes(&neighbors);

        let num_disabled_vertices = if params.flags.contains(ClusteredMeshFlags::VERTEX_SMOOTHING)
        {
            smooth_vertices(&vertices, &triangles, &vertex_triangles, &mut edge_codes)
        } else {
            0
        };

        let entries: Vec<_> = triangles
            .iter()
            .enumerate()
            .map(|(tid, tri)| KdEntry::from_triangle(tid as u32, &vertices, tri))
            .collect();
        let aabb = entries
            .iter()
            .fold(Aabb::new_invalid(), |aabb, e| aabb.merged(&e.aabb));

        let mut kd_tree = KdTree::build(entries, aabb, &params.kd_tree)?;
        let mut layout = build_clusters(&mut kd_tree, &triangles)?;

        if params.flags.contains(ClusteredMeshFlags::COMPRESS_VERTICES) {
            for cluster in &mut layout.clusters {
                let points = cluster.vertex_ids.iter().map(|v| &vertices[*v as usize]);
                let selected = select_compression_mode(points.clone(), params.granularity);
                cluster.compression_mode = resolve_compression_mode(
                    selected,
                    points,
                    params.granularity,
                    cluster.cluster_id,
                );
            }
        }

        let kd_nodes = kd_tree.to_runtime_nodes()?;

        let mesh = ClusteredMesh {
            vertices,
            triangles,
            surface_ids,
            neighbors,
            edge_codes,
            kd_tree,
            kd_nodes,
            layout,
            aabb,
            params,
            num_disabled_vertices,
        };

        log::debug!("Built a clustered mesh: {:?}", mesh.statistics());

        Ok(mesh)
    }
}

/// A triangle mesh organized for collision detection: a KD-tree over its triangles whose
/// leaves reference clusters of triangles sharing a small vertex pool.
#[derive(Clone, Debug)]
pub struct ClusteredMesh {
    vertices: Vec<Point<Real>>,
    triangles: Vec<[u32; 3]>,
    surface_ids: Vec<u16>,
    neighbors: TriangleNeighbors,
    edge_codes: Vec<[EdgeCode; 3]>,
    kd_tree: KdTree,
    kd_nodes: Vec<KdRuntimeNode>,
    layout: ClusterLayout,
    aabb: Aabb,
    params: ClusteredMeshParams,
    num_disabled_vertices: usize,
}

impl ClusteredMesh {
    /// The vertex buffer.
    #[inline]
    pub fn vertices(&self) -> &[Point<Real>] {
        &self.vertices
    }

    /// The triangles left after dropping the degenerate ones.
    #[inline]
    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    /// The surface id of every triangle.
    #[inline]
    pub fn surface_ids(&self) -> &[u16] {
        &self.surface_ids
    }

    /// The adjacency of every triangle edge.
    #[inline]
    pub fn neighbors(&self) -> &TriangleNeighbors {
        &self.neighbors
    }

    /// The edge codes of every triangle.
    #[inline]
    pub fn edge_codes(&self) -> &[[EdgeCode; 3]] {
        &self.edge_codes
    }

    /// The KD-tree over the triangles.
    ///
    /// The `first_entry` of its leaves holds unit addresses.
    #[inline]
    pub fn kd_tree(&self) -> &KdTree {
        &self.kd_tree
    }

    /// The flattened KD-tree read by the runtime.
    #[inline]
    pub fn kd_nodes(&self) -> &[KdRuntimeNode] {
        &self.kd_nodes
    }

    /// The clusters.
    #[inline]
    pub fn clusters(&self) -> &[UnitCluster] {
        &self.layout.clusters
    }

    /// The clusters along with their unit addressing parameters.
    #[inline]
    pub fn cluster_layout(&self) -> &ClusterLayout {
        &self.layout
    }

    /// The bounding box of the triangles.
    #[inline]
    pub fn aabb(&self) -> &Aabb {
        &self.aabb
    }

    /// The parameters this mesh was built with.
    #[inline]
    pub fn params(&self) -> &ClusteredMeshParams {
        &self.params
    }

    /// Counts describing this mesh.
    pub fn statistics(&self) -> ClusteredMeshStatistics {
        let mut stats = ClusteredMeshStatistics {
            num_triangles: self.triangles.len(),
            num_clusters: self.layout.clusters.len(),
            num_branch_nodes: self.kd_tree.num_branch_nodes(),
            num_leaves: self.kd_tree.num_leaves(),
            num_empty_leaves: self
                .kd_tree
                .nodes()
                .iter()
                .filter(|n| n.is_leaf() && n.num_entries == 0)
                .count(),
            num_disabled_vertices: self.num_disabled_vertices,
            ..Default::default()
        };

        for cluster in &self.layout.clusters {
            match cluster.compression_mode {
                CompressionMode::Uncompressed => stats.num_uncompressed_clusters += 1,
                CompressionMode::Int16 { .. } => stats.num_int16_clusters += 1,
                CompressionMode::Int32 => stats.num_int32_clusters += 1,
            }
        }

        stats
    }

    /// Serializes this mesh into the big-endian blob loaded by the runtime.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SerializationError> {
        let blob = ClusteredMeshBlob {
            aabb: self.aabb,
            vertex_compression: self
                .params
                .flags
                .contains(ClusteredMeshFlags::COMPRESS_VERTICES),
            kd_nodes: &self.kd_nodes,
            num_kd_entries: self.kd_tree.entries().len() as u32,
            layout: &self.layout,
            mesh: ClusterMeshData {
                vertices: &self.vertices,
                triangles: &self.triangles,
                edge_codes: &self.edge_codes,
                surface_ids: &self.surface_ids,
                granularity: self.params.granularity,
            },
        };

        let (bytes, modes) = serialize_clustered_mesh(&blob)?;
        debug_assert!(modes
            .iter()
            .zip(&self.layout.clusters)
            .all(|(mode, cluster)| *mode == cluster.compression_mode));
        Ok(bytes)
    }
}

/// Builds several independent clustered meshes in parallel.
///
/// The results are returned in the order of `builders`.
#[cfg(feature = "parallel")]
pub fn build_clustered_meshes(
    builders: Vec<ClusteredMeshBuilder>,
) -> Vec<Result<ClusteredMesh, ClusteredMeshBuilderError>> {
    use rayon::prelude::*;

    builders
        .into_par_iter()
        .map(ClusteredMeshBuilder::build)
        .collect()
}
