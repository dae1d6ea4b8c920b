use crate::{grid_mesh, read_f32, read_u16, read_u32};
use clustered_mesh::serialization::unit_tag_bits;
use clustered_mesh::ClusteredMeshBuilder;

#[test]
fn clustered_mesh_layout() {
    let (vertices, triangles) = grid_mesh(40, 30, 0.5, |i, j| ((i * j) % 5) as f32 * 0.25);
    let mesh = ClusteredMeshBuilder::new(vertices, triangles).build().unwrap();
    let layout = mesh.cluster_layout();
    let bytes = mesh.to_bytes().unwrap();

    let num_branches = mesh.kd_nodes().len();
    let num_clusters = layout.clusters.len();
    let table_offset = (96 + 48 + 32 * num_branches + 15) / 16 * 16;

    assert_eq!(bytes.len() % 16, 0);
    assert_eq!(read_u32(&bytes, 0x00), 0);
    assert_eq!(read_u32(&bytes, 0x04), 96);
    assert_eq!(read_u32(&bytes, 0x08) as usize, table_offset);
    assert_eq!(read_u32(&bytes, 0x0C) as usize, num_clusters);
    assert_eq!(read_f32(&bytes, 0x10), mesh.aabb().mins.x);
    assert_eq!(read_f32(&bytes, 0x24), mesh.aabb().maxs.y);
    assert_eq!(read_f32(&bytes, 0x30), mesh.params().granularity);
    assert_eq!(
        read_u32(&bytes, 0x34),
        unit_tag_bits(num_clusters, layout.max_unit_stream_bytes)
    );
    assert_eq!(read_u32(&bytes, 0x38), 2400);
    assert_eq!(read_u32(&bytes, 0x3C) as usize, num_clusters);
    assert_eq!(read_u32(&bytes, 0x40), layout.max_unit_stream_bytes);
    assert_eq!(read_u32(&bytes, 0x44), layout.unit_offset_bits);
    assert_eq!(read_u16(&bytes, 0x48), 1);
    assert_eq!(bytes[0x4A], 0);
    assert_eq!(bytes[0x4B], 2);
    assert_eq!(read_u32(&bytes, 0x4C) as usize, bytes.len());

    // KD-tree blob.
    assert_eq!(read_u32(&bytes, 96), 48);
    assert_eq!(read_u32(&bytes, 100) as usize, num_branches);
    assert_eq!(read_u32(&bytes, 104), 2400);

    // Clusters are contiguous and 16-byte aligned.
    let cluster_offsets: Vec<usize> = (0..num_clusters)
        .map(|i| read_u32(&bytes, table_offset + 4 * i) as usize)
        .collect();
    assert_eq!(cluster_offsets[0], (table_offset + 4 * num_clusters + 15) / 16 * 16);
    for (i, offset) in cluster_offsets.iter().enumerate() {
        assert_eq!(offset % 16, 0);
        let size = read_u16(&bytes, offset + 8) as usize;
        let end = cluster_offsets.get(i + 1).copied().unwrap_or(bytes.len());
        assert_eq!(offset + size, end);

        let cluster = &layout.clusters[i];
        assert_eq!(read_u16(&bytes, *offset) as usize, cluster.num_units());
        assert_eq!(bytes[offset + 0x0A] as usize, cluster.num_vertices());
    }

    // Every leaf address points to a unit record.
    let mask = (1u32 << layout.unit_offset_bits) - 1;
    for node in 0..num_branches {
        let node_offset = 96 + 48 + 32 * node;
        for child in 0..2 {
            let content = read_u32(&bytes, node_offset + 8 + 8 * child);
            let index = read_u32(&bytes, node_offset + 12 + 8 * child);
            if content == 0xFFFF_FFFF || content == 0 {
                continue;
            }

            let cluster_offset = cluster_offsets[(index >> layout.unit_offset_bits) as usize];
            let unit_start = read_u16(&bytes, cluster_offset + 4) as usize * 16;
            let unit = cluster_offset + 16 + unit_start + (index & mask) as usize;
            assert_eq!(bytes[unit], 0xA1);
        }
    }
}
