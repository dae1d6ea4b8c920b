use crate::bounding_volume::Aabb;
use crate::cluster::{ClusterLayout, CompressionMode};
use crate::partitioning::KdRuntimeNode;
use crate::serialization::{write_cluster, write_kd_tree, ByteWriter, ClusterMeshData};
use crate::serialization::{SerializationError, KD_TREE_HEADER_SIZE, KD_TREE_NODE_SIZE};
use crate::utils::{align_up, floor_log2, QUAD_WORD};
use alloc::vec::Vec;

/// Size in bytes of a serialized clustered mesh header.
pub const CLUSTERED_MESH_HEADER_SIZE: usize = 96;

/// Flag of the clustered mesh header set when cluster vertices may be compressed.
pub const CLUSTER_FLAG_VERTEX_COMPRESSION: u16 = 0x0001;

/// Size in bytes of the surface id of every unit.
pub const SURFACE_ID_SIZE: u8 = 2;

/// Size in bytes of the group id of every unit.
pub const GROUP_ID_SIZE: u8 = 0;

/// The number of bits of a unit tag.
pub fn unit_tag_bits(num_clusters: usize, max_unit_stream_bytes: u32) -> u32 {
    let cluster_bits = 1 + floor_log2(num_clusters.max(1) as u32);
    let offset_bits = 1 + floor_log2(max_unit_stream_bytes.max(1));
    (cluster_bits + offset_bits).saturating_sub(4)
}

/// Everything written into a clustered mesh blob.
#[derive(Copy, Clone, Debug)]
pub struct ClusteredMeshBlob<'a> {
    /// The bounding box of the mesh.
    pub aabb: Aabb,
    /// Are cluster vertices allowed to be compressed?
    pub vertex_compression: bool,
    /// The flattened KD-tree, with leaves addressing units.
    pub kd_nodes: &'a [KdRuntimeNode],
    /// The number of entries of the KD-tree.
    pub num_kd_entries: u32,
    /// The clusters and their addressing parameters.
    pub layout: &'a ClusterLayout,
    /// The triangle data referenced by the clusters.
    pub mesh: ClusterMeshData<'a>,
}

/// Serializes a clustered mesh: its header, its KD-tree, its cluster pointer table and its
/// clusters, every section starting on a 16-byte boundary.
///
/// Returns the blob along with the compression mode written for every cluster.
pub fn serialize_clustered_mesh(
    blob: &ClusteredMeshBlob,
) -> Result<(Vec<u8>, Vec<CompressionMode>), SerializationError> {
    let layout = blob.layout;
    let num_clusters = layout.clusters.len();

    let kd_offset = CLUSTERED_MESH_HEADER_SIZE;
    let kd_size = KD_TREE_HEADER_SIZE + blob.kd_nodes.len() * KD_TREE_NODE_SIZE;
    let table_offset = align_up(kd_offset + kd_size, QUAD_WORD);

    let mut writer = ByteWriter::with_capacity(table_offset + 4 * num_clusters);

    writer.put_u32(0);
    writer.put_u32(kd_offset as u32);
    writer.put_u32(table_offset as u32);
    writer.put_u32(num_clusters as u32);
    writer.put_point_padded(&blob.aabb.mins);
    writer.put_point_padded(&blob.aabb.maxs);
    writer.put_f32(blob.mesh.granularity);
    writer.put_u32(unit_tag_bits(num_clusters, layout.max_unit_stream_bytes));
    writer.put_u32(layout.num_units() as u32);
    writer.put_u32(num_clusters as u32);
    writer.put_u32(layout.max_unit_stream_bytes);
    writer.put_u32(layout.unit_offset_bits);
    writer.put_u16(if blob.vertex_compression {
        CLUSTER_FLAG_VERTEX_COMPRESSION
    } else {
        0
    });
    writer.put_u8(GROUP_ID_SIZE);
    writer.put_u8(SURFACE_ID_SIZE);
    // Total size, backfilled.
    writer.put_u32(0);
    writer.put_zeros(16);
    debug_assert_eq!(writer.len(), CLUSTERED_MESH_HEADER_SIZE);

    write_kd_tree(&mut writer, blob.kd_nodes, blob.num_kd_entries, &blob.aabb);
    writer.pad_to(QUAD_WORD);
    debug_assert_eq!(writer.len(), table_offset);

    // Cluster pointers, backfilled.
    writer.put_zeros(4 * num_clusters);
    writer.pad_to(QUAD_WORD);

    let mut modes = Vec::with_capacity(num_clusters);
    for (i, cluster) in layout.clusters.iter().enumerate() {
        writer.pad_to(QUAD_WORD);
        let offset = u32::try_from(writer.len()).map_err(|_| SerializationError::FieldOverflow {
            field: "cluster offset",
            value: writer.len(),
        })?;
        writer.patch_u32(table_offset + 4 * i, offset);
        modes.push(write_cluster(&mut writer, cluster, &blob.mesh)?);
    }
    writer.pad_to(QUAD_WORD);

    let total_size = u32::try_from(writer.len()).map_err(|_| SerializationError::FieldOverflow {
        field: "clustered mesh size",
        value: writer.len(),
    })?;
    writer.patch_u32(0x4C, total_size);

    log::debug!(
        "Serialized a clustered mesh of {} clusters into {} bytes.",
        num_clusters,
        total_size
    );

    Ok((writer.into_bytes(), modes))
}
