use crate::cluster::CompressionMode;
use alloc::vec::Vec;

/// Maximum number of vertices of a cluster: local vertex indices are bytes and `0xFF` is
/// reserved.
pub const MAX_CLUSTER_VERTICES: usize = 255;

/// Vertices reserved for every unit added to a cluster, enough for a quad.
pub const UNIT_VERTEX_BUDGET: usize = 4;

/// Size in bytes of a serialized unit record.
pub const UNIT_SIZE: usize = 9;

/// Maximum number of units of a cluster, so its serialized size always fits a `u16`.
pub const MAX_CLUSTER_UNITS: usize =
    (u16::MAX as usize - 16 - 16 * MAX_CLUSTER_VERTICES - 15) / UNIT_SIZE;

/// Errors raised while assembling or addressing clusters.
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClusterError {
    /// A unit references a vertex missing from its cluster vertex list.
    #[error("cluster {cluster} doesn't contain the vertex {vertex}.")]
    UnknownVertex {
        /// The cluster id.
        cluster: u32,
        /// The global vertex index.
        vertex: u32,
    },
    /// A local vertex index doesn't fit in a unit record.
    #[error("cluster {cluster} has a local vertex index {local_index} above 254.")]
    LocalIndexOverflow {
        /// The cluster id.
        cluster: u32,
        /// The out of range local index.
        local_index: usize,
    },
    /// A unit address doesn't fit in 32 bits.
    #[error("the units of cluster {cluster} can't be addressed with {unit_offset_bits} offset bits.")]
    AddressOverflow {
        /// The cluster id.
        cluster: u32,
        /// Number of bits of the unit offset part of an address.
        unit_offset_bits: u32,
    },
}

/// A group of triangles (units) sharing a small pool of vertices.
///
/// Units are stored in the order their triangles appear in the KD-tree leaves. Once
/// [compacted](UnitCluster::compact_vertices), the vertex list is strictly increasing so
/// global vertex indices can be mapped to local byte indices with a binary search.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct UnitCluster {
    /// Index of this cluster in its clustered mesh.
    pub cluster_id: u32,
    /// The triangle index of every unit.
    pub unit_ids: Vec<u32>,
    /// The global indices of the vertices used by the units.
    pub vertex_ids: Vec<u32>,
    /// How the vertices of this cluster are stored.
    pub compression_mode: CompressionMode,
}

impl UnitCluster {
    /// Creates an empty cluster.
    pub fn new(cluster_id: u32) -> Self {
        Self {
            cluster_id,
            ..Default::default()
        }
    }

    /// The number of units of this cluster.
    #[inline]
    pub fn num_units(&self) -> usize {
        self.unit_ids.len()
    }

    /// The number of vertices of this cluster.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertex_ids.len()
    }

    /// The size in bytes of the serialized unit records of this cluster.
    #[inline]
    pub fn unit_stream_size(&self) -> usize {
        self.num_units() * UNIT_SIZE
    }

    /// Can one more unit be added without compacting the vertex list?
    #[inline]
    fn has_room_for_unit(&self) -> bool {
        self.num_vertices() + UNIT_VERTEX_BUDGET <= MAX_CLUSTER_VERTICES
            && self.num_units() < MAX_CLUSTER_UNITS
    }

    /// Tries to add the triangle `tid` to this cluster.
    ///
    /// The vertex list is only compacted when the worst-case budget of a unit doesn't fit.
    /// Returns `false`, leaving `self` compacted but otherwise unchanged, if the triangle still
    /// doesn't fit.
    pub fn try_add_triangle(&mut self, tid: u32, tri: &[u32; 3]) -> bool {
        if !self.has_room_for_unit() {
            self.compact_vertices();

            if !self.has_room_for_unit() {
                return false;
            }
        }

        self.unit_ids.push(tid);
        self.vertex_ids.extend_from_slice(tri);
        true
    }

    /// Sorts the vertex list and removes its duplicates.
    pub fn compact_vertices(&mut self) {
        self.vertex_ids.sort_unstable();
        self.vertex_ids.dedup();
    }

    /// Appends the units of `other` to `self` if their merged vertex list fits in a cluster.
    ///
    /// Both vertex lists must be compacted. The merge walks both lists once and gives up as
    /// soon as more than [`MAX_CLUSTER_VERTICES`] distinct vertices are found. Returns `false`,
    /// leaving both clusters untouched, on failure.
    pub fn try_merge(&mut self, other: &UnitCluster) -> bool {
        if self.num_units() + other.num_units() > MAX_CLUSTER_UNITS {
            return false;
        }

        let (a, b) = (&self.vertex_ids, &other.vertex_ids);
        let mut merged = Vec::with_capacity(MAX_CLUSTER_VERTICES);
        let (mut i, mut j) = (0, 0);

        loop {
            let next = match (a.get(i), b.get(j)) {
                (None, None) => break,
                (Some(va), Some(vb)) if va == vb => {
                    i += 1;
                    j += 1;
                    *va
                }
                (Some(va), Some(vb)) if va < vb => {
                    i += 1;
                    *va
                }
                (_, Some(vb)) => {
                    j += 1;
                    *vb
                }
                (Some(va), None) => {
                    i += 1;
                    *va
                }
            };

            if merged.len() == MAX_CLUSTER_VERTICES {
                return false;
            }
            merged.push(next);
        }

        self.vertex_ids = merged;
        self.unit_ids.extend_from_slice(&other.unit_ids);
        true
    }

    /// The local index of the global vertex `vid` in this cluster.
    pub fn local_vertex_index(&self, vid: u32) -> Result<u8, ClusterError> {
        let local_index =
            self.vertex_ids
                .binary_search(&vid)
                .map_err(|_| ClusterError::UnknownVertex {
                    cluster: self.cluster_id,
                    vertex: vid,
                })?;

        if local_index >= MAX_CLUSTER_VERTICES {
            return Err(ClusterError::LocalIndexOverflow {
                cluster: self.cluster_id,
                local_index,
            });
        }

        Ok(local_index as u8)
    }

    /// The local vertex indices of every unit of this cluster.
    pub fn local_triangles<'a>(
        &'a self,
        triangles: &'a [[u32; 3]],
    ) -> impl Iterator<Item = Result<[u8; 3], ClusterError>> + 'a {
        self.unit_ids.iter().map(move |tid| {
            let tri = &triangles[*tid as usize];
            Ok([
                self.local_vertex_index(tri[0])?,
                self.local_vertex_index(tri[1])?,
                self.local_vertex_index(tri[2])?,
            ])
        })
    }

    /// Panics if `self` isn't a finalized cluster of the mesh with the given triangles.
    ///
    /// The vertex list must be strictly increasing, at most [`MAX_CLUSTER_VERTICES`] long, and
    /// contain exactly the vertices of its units.
    pub fn assert_well_formed(&self, triangles: &[[u32; 3]]) {
        assert!(self.num_vertices() <= MAX_CLUSTER_VERTICES);
        assert!(self.num_units() <= MAX_CLUSTER_UNITS);
        assert!(
            self.vertex_ids.windows(2).all(|w| w[0] < w[1]),
            "cluster vertex list isn't strictly increasing"
        );

        for local in self.local_triangles(triangles) {
            let local = local.unwrap();
            assert!(local.iter().all(|i| (*i as usize) < MAX_CLUSTER_VERTICES));
        }

        for vid in &self.vertex_ids {
            assert!(self
                .unit_ids
                .iter()
                .any(|tid| triangles[*tid as usize].contains(vid)));
        }
    }
}
