use crate::grid_mesh;
use clustered_mesh::cluster::CompressionMode;
use clustered_mesh::math::{Point, Real};
use clustered_mesh::{ClusteredMesh, ClusteredMeshBuilder, ClusteredMeshFlags, ClusteredMeshParams};

fn random_terrain(seed: u64, n: u32) -> ClusteredMesh {
    let mut rng = oorandom::Rand32::new(seed);
    let heights: Vec<Real> = (0..(n + 1) * (n + 1))
        .map(|_| rng.rand_float() * 3.0)
        .collect();
    let (vertices, triangles) = grid_mesh(n, n, 1.0, |i, j| heights[(i * (n + 1) + j) as usize]);
    let surface_ids = (0..triangles.len()).map(|i| (i % 7) as u16).collect();

    let params = ClusteredMeshParams {
        flags: ClusteredMeshFlags::VERTEX_SMOOTHING | ClusteredMeshFlags::COMPRESS_VERTICES,
        ..ClusteredMeshParams::default()
    };

    ClusteredMeshBuilder::new(vertices, triangles)
        .with_surface_ids(surface_ids)
        .with_params(params)
        .build()
        .unwrap()
}

#[test]
fn random_terrain_clusters_are_well_formed() {
    let mesh = random_terrain(0, 60);
    let stats = mesh.statistics();

    assert_eq!(stats.num_triangles, 7200);
    assert!(stats.num_clusters > 1);
    assert_eq!(stats.num_leaves, stats.num_branch_nodes + 1);
    assert_eq!(mesh.kd_nodes().len(), stats.num_branch_nodes);
    assert_eq!(
        stats.num_uncompressed_clusters + stats.num_int16_clusters + stats.num_int32_clusters,
        stats.num_clusters
    );

    let mut seen = vec![0; mesh.triangles().len()];
    for cluster in mesh.clusters() {
        cluster.assert_well_formed(mesh.triangles());
        for tid in &cluster.unit_ids {
            seen[*tid as usize] += 1;
        }
    }
    assert!(seen.iter().all(|count| *count == 1));
}

#[test]
fn builds_are_deterministic() {
    let a = random_terrain(5, 30);
    let b = random_terrain(5, 30);

    assert_eq!(a.edge_codes(), b.edge_codes());
    assert_eq!(a.kd_nodes(), b.kd_nodes());
    assert_eq!(a.to_bytes().unwrap(), b.to_bytes().unwrap());
}

#[test]
fn thousand_triangles_use_int16() {
    let (vertices, triangles) = grid_mesh(25, 20, 0.4, |i, j| ((i + j) % 3) as Real * 0.1);
    assert_eq!(triangles.len(), 1000);

    let mesh = ClusteredMeshBuilder::new(vertices, triangles).build().unwrap();
    let stats = mesh.statistics();
    assert_eq!(stats.num_int16_clusters, stats.num_clusters);

    // No fallback when serializing.
    let bytes = mesh.to_bytes().unwrap();
    let table = crate::read_u32(&bytes, 0x08) as usize;
    for i in 0..stats.num_clusters {
        let cluster = crate::read_u32(&bytes, table + 4 * i) as usize;
        assert_eq!(bytes[cluster + 0x0C], 1);
    }
}

#[test]
fn wide_meshes_use_int32() {
    let (vertices, triangles) = grid_mesh(10, 10, 100.0, |_, _| 0.0);
    let mesh = ClusteredMeshBuilder::new(vertices, triangles).build().unwrap();

    assert!(mesh
        .clusters()
        .iter()
        .all(|c| c.compression_mode == CompressionMode::Int32));
}

#[test]
fn compression_can_be_disabled() {
    let (vertices, triangles) = grid_mesh(10, 10, 1.0, |_, _| 0.0);
    let params = ClusteredMeshParams {
        flags: ClusteredMeshFlags::empty(),
        ..ClusteredMeshParams::default()
    };
    let mesh = ClusteredMeshBuilder::new(vertices, triangles)
        .with_params(params)
        .build()
        .unwrap();

    assert!(mesh
        .clusters()
        .iter()
        .all(|c| c.compression_mode == CompressionMode::Uncompressed));

    let bytes = mesh.to_bytes().unwrap();
    assert_eq!(crate::read_u16(&bytes, 0x48), 0);
}

#[test]
fn overflowing_clusters_are_frozen_uncompressed() {
    // 1e7 / 0.001 doesn't fit in 32 bits.
    let (mut vertices, triangles) = grid_mesh(4, 4, 1.0, |_, _| 0.0);
    for pt in &mut vertices {
        pt.x += 1.0e7;
    }

    let mesh = ClusteredMeshBuilder::new(vertices, triangles).build().unwrap();
    let stats = mesh.statistics();
    assert_eq!(stats.num_uncompressed_clusters, stats.num_clusters);
    assert_eq!(stats.num_int16_clusters + stats.num_int32_clusters, 0);

    let bytes = mesh.to_bytes().unwrap();
    let table = crate::read_u32(&bytes, 0x08) as usize;
    for (i, cluster) in mesh.clusters().iter().enumerate() {
        let offset = crate::read_u32(&bytes, table + 4 * i) as usize;
        assert_eq!(bytes[offset + 0x0C], cluster.compression_mode.mode_byte());
        assert_eq!(bytes[offset + 0x0C], 0);
    }
}

#[test]
fn tiny_granularity_falls_back_without_panicking() {
    let vertices = vec![
        Point::new(-1.0, 0.0, 0.0),
        Point::new(1.0, 0.0, 0.0),
        Point::new(0.0, 0.0, 1.0),
    ];
    let params = ClusteredMeshParams {
        granularity: 1.0e-30,
        ..ClusteredMeshParams::default()
    };
    let mesh = ClusteredMeshBuilder::new(vertices, vec![[0, 2, 1]])
        .with_params(params)
        .build()
        .unwrap();

    assert_eq!(mesh.clusters().len(), 1);
    assert_eq!(
        mesh.clusters()[0].compression_mode,
        CompressionMode::Uncompressed
    );
    assert_eq!(mesh.statistics().num_uncompressed_clusters, 1);

    let bytes = mesh.to_bytes().unwrap();
    let table = crate::read_u32(&bytes, 0x08) as usize;
    let offset = crate::read_u32(&bytes, table) as usize;
    assert_eq!(bytes[offset + 0x0C], 0);
}
