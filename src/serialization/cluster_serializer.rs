use crate::cluster::{resolve_compression_mode, CompressionMode, UnitCluster};
use crate::cluster::{encode_int16, encode_int32, UNIT_SIZE};
use crate::math::{Point, Real};
use crate::mesh::EdgeCode;
use crate::serialization::{ByteWriter, SerializationError};
use crate::utils::{is_aligned, QUAD_WORD};

/// Size in bytes of a serialized cluster header.
pub const CLUSTER_HEADER_SIZE: usize = 16;

/// Flags leading every serialized unit record.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct UnitFlags(u8);

bitflags::bitflags! {
    impl UnitFlags: u8 {
        /// The unit is a triangle.
        const TRIANGLE = 0x01;
        /// The unit record holds edge codes.
        const EDGE_ANGLE = 0x20;
        /// The unit record holds a group id.
        const GROUP_ID = 0x40;
        /// The unit record holds a surface id.
        const SURFACE_ID = 0x80;
    }
}

/// The per-triangle data of a mesh referenced by its clusters.
#[derive(Copy, Clone, Debug)]
pub struct ClusterMeshData<'a> {
    /// The vertex positions.
    pub vertices: &'a [Point<Real>],
    /// The triangles.
    pub triangles: &'a [[u32; 3]],
    /// The edge codes of every triangle.
    pub edge_codes: &'a [[EdgeCode; 3]],
    /// The surface id of every triangle.
    pub surface_ids: &'a [u16],
    /// The vertex compression granularity.
    pub granularity: Real,
}

fn to_u16(field: &'static str, value: usize) -> Result<u16, SerializationError> {
    u16::try_from(value).map_err(|_| SerializationError::FieldOverflow { field, value })
}

/// Appends a cluster to `writer`, which must be 16-byte aligned.
///
/// The compression mode of the cluster falls back to a less compact one if some vertex can't
/// be encoded with it. Returns the compression mode actually written.
pub fn write_cluster(
    writer: &mut ByteWriter,
    cluster: &UnitCluster,
    mesh: &ClusterMeshData,
) -> Result<CompressionMode, SerializationError> {
    debug_assert!(is_aligned(writer.len(), QUAD_WORD));

    let start = writer.len();
    let points = cluster.vertex_ids.iter().map(|v| &mesh.vertices[*v as usize]);
    let mode = resolve_compression_mode(
        cluster.compression_mode,
        points.clone(),
        mesh.granularity,
        cluster.cluster_id,
    );

    let num_units = to_u16("unit count", cluster.num_units())?;
    let unit_data_size = to_u16("unit data size", cluster.unit_stream_size())?;
    let num_vertices = u8::try_from(cluster.num_vertices()).map_err(|_| {
        SerializationError::FieldOverflow {
            field: "vertex count",
            value: cluster.num_vertices(),
        }
    })?;
    let payload_size = crate::utils::align_up(mode.payload_size(cluster.num_vertices()), QUAD_WORD);
    let unit_data_start = to_u16("unit data start", payload_size / QUAD_WORD)?;

    writer.put_u16(num_units);
    writer.put_u16(unit_data_size);
    writer.put_u16(unit_data_start);
    // No normals: they start where the units start.
    writer.put_u16(unit_data_start);
    // Total size, backfilled.
    writer.put_u16(0);
    writer.put_u8(num_vertices);
    writer.put_u8(0);
    writer.put_u8(mode.mode_byte());
    writer.put_zeros(3);

    let overflow = || SerializationError::VertexOverflow {
        cluster: cluster.cluster_id,
        mode,
    };

    match mode {
        CompressionMode::Uncompressed => {
            for pt in points {
                writer.put_point_padded(pt);
            }
        }
        CompressionMode::Int16 { offset } => {
            for value in offset {
                writer.put_i32(value);
            }
            for pt in points {
                let coords = encode_int16(pt, &offset, mesh.granularity).ok_or_else(overflow)?;
                for value in coords {
                    writer.put_u16(value);
                }
            }
        }
        CompressionMode::Int32 => {
            for pt in points {
                let coords = encode_int32(pt, mesh.granularity).ok_or_else(overflow)?;
                for value in coords {
                    writer.put_i32(value);
                }
            }
        }
    }
    writer.pad_to(QUAD_WORD);
    debug_assert_eq!(writer.len() - start, CLUSTER_HEADER_SIZE + payload_size);

    let flags = UnitFlags::TRIANGLE | UnitFlags::EDGE_ANGLE | UnitFlags::SURFACE_ID;

    for (tid, local) in cluster
        .unit_ids
        .iter()
        .zip(cluster.local_triangles(mesh.triangles))
    {
        let local = local?;
        let codes = &mesh.edge_codes[*tid as usize];

        writer.put_u8(flags.bits());
        for index in local {
            writer.put_u8(index);
        }
        for code in codes {
            writer.put_u8(code.bits());
        }
        writer.put_u16_le(mesh.surface_ids[*tid as usize]);
    }
    debug_assert_eq!(
        writer.len() - start,
        CLUSTER_HEADER_SIZE + payload_size + cluster.num_units() * UNIT_SIZE
    );
    writer.pad_to(QUAD_WORD);

    let total_size = to_u16("cluster size", writer.len() - start)?;
    writer.patch_u16(start + 8, total_size);

    Ok(mode)
}

/// Serializes a single cluster.
pub fn serialize_cluster(
    cluster: &UnitCluster,
    mesh: &ClusterMeshData,
) -> Result<alloc::vec::Vec<u8>, SerializationError> {
    let mut writer = ByteWriter::new();
    let _ = write_cluster(&mut writer, cluster, mesh)?;
    Ok(writer.into_bytes())
}
