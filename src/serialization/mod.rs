//! Big-endian binary serialization of clusters, KD-trees and clustered meshes.

pub use self::byte_writer::ByteWriter;
pub use self::cluster_serializer::{
    serialize_cluster, write_cluster, ClusterMeshData, UnitFlags, CLUSTER_HEADER_SIZE,
};
pub use self::clustered_mesh_serializer::{
    serialize_clustered_mesh, unit_tag_bits, ClusteredMeshBlob, CLUSTERED_MESH_HEADER_SIZE,
    CLUSTER_FLAG_VERTEX_COMPRESSION, GROUP_ID_SIZE, SURFACE_ID_SIZE,
};
pub use self::kd_tree_serializer::{write_kd_tree, KD_TREE_HEADER_SIZE, KD_TREE_NODE_SIZE};

use crate::cluster::{ClusterError, CompressionMode};

mod byte_writer;
mod cluster_serializer;
mod clustered_mesh_serializer;
mod kd_tree_serializer;

/// Errors raised while serializing clustered mesh structures.
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum SerializationError {
    /// A cluster couldn't map its units to local vertices.
    #[error(transparent)]
    Cluster(#[from] ClusterError),
    /// A value doesn't fit in its header field.
    #[error("the {field} ({value}) doesn't fit in its header field.")]
    FieldOverflow {
        /// The name of the field.
        field: &'static str,
        /// The value that overflowed.
        value: usize,
    },
    /// A vertex can't be encoded with the compression mode chosen for its cluster.
    #[error("a vertex of cluster {cluster} can't be encoded with the {mode:?} compression mode.")]
    VertexOverflow {
        /// The cluster id.
        cluster: u32,
        /// The compression mode.
        mode: CompressionMode,
    },
}
