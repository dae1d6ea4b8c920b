use clustered_mesh::math::Point;
use clustered_mesh::mesh::{EdgeCode, TriangleValidationError, EDGE_ANGLE_ZERO};
use clustered_mesh::{
    ClusteredMeshBuilder, ClusteredMeshBuilderError, ClusteredMeshFlags, ClusteredMeshParams,
};

fn unit_square() -> (Vec<Point<f32>>, Vec<[u32; 3]>) {
    let vertices = vec![
        Point::new(0.0, 0.0, 0.0),
        Point::new(1.0, 0.0, 0.0),
        Point::new(1.0, 0.0, 1.0),
        Point::new(0.0, 0.0, 1.0),
        // Middle of the first side.
        Point::new(0.5, 0.0, 0.0),
    ];
    let triangles = vec![[0, 4, 3], [4, 1, 2], [4, 2, 3]];
    (vertices, triangles)
}

#[test]
fn unit_square_edge_codes() {
    let (vertices, triangles) = unit_square();
    let mesh = ClusteredMeshBuilder::new(vertices, triangles).build().unwrap();

    assert_eq!(mesh.triangles().len(), 3);
    assert_eq!(mesh.clusters().len(), 1);
    assert_eq!(mesh.clusters()[0].vertex_ids, [0, 1, 2, 3, 4]);

    let shared = [(0, 1), (2, 2), (1, 2), (2, 0)];
    for (tid, codes) in mesh.edge_codes().iter().enumerate() {
        for (edge, code) in codes.iter().enumerate() {
            if shared.contains(&(tid, edge)) {
                assert_eq!(code.angle_byte(), EDGE_ANGLE_ZERO);
                assert!(!code.contains(EdgeCode::CONVEX));
                assert!(!code.contains(EdgeCode::UNMATCHED));
            } else {
                assert!(code.contains(EdgeCode::UNMATCHED), "{} {}", tid, edge);
                assert_eq!(code.angle_byte(), EDGE_ANGLE_ZERO);
            }
        }
    }

    assert_eq!(mesh.neighbors().mate(0, 1), Some((2, 2)));
    assert_eq!(mesh.neighbors().mate(1, 2), Some((2, 0)));
}

#[test]
fn smoothing_disables_flat_vertices() {
    let (vertices, triangles) = unit_square();
    let params = ClusteredMeshParams {
        flags: ClusteredMeshFlags::VERTEX_SMOOTHING | ClusteredMeshFlags::COMPRESS_VERTICES,
        ..ClusteredMeshParams::default()
    };
    let mesh = ClusteredMeshBuilder::new(vertices, triangles)
        .with_params(params)
        .build()
        .unwrap();

    assert_eq!(mesh.statistics().num_disabled_vertices, 5);
    assert!(mesh
        .edge_codes()
        .iter()
        .flatten()
        .all(|code| code.contains(EdgeCode::VERTEX_DISABLED)));

    // Without the flag, vertices keep their collisions.
    let (vertices, triangles) = unit_square();
    let mesh = ClusteredMeshBuilder::new(vertices, triangles).build().unwrap();
    assert!(mesh
        .edge_codes()
        .iter()
        .flatten()
        .all(|code| !code.contains(EdgeCode::VERTEX_DISABLED)));
}

#[test]
fn degenerate_meshes_are_rejected() {
    let vertices = vec![Point::new(1.0, 2.0, 3.0)];
    let result = ClusteredMeshBuilder::new(vertices, vec![[0, 0, 0]]).build();
    assert_eq!(
        result.err(),
        Some(ClusteredMeshBuilderError::InvalidTriangles(
            TriangleValidationError::AllTrianglesDegenerate(1)
        ))
    );

    let result = ClusteredMeshBuilder::new(vec![], vec![]).build();
    assert_eq!(
        result.err(),
        Some(ClusteredMeshBuilderError::InvalidTriangles(
            TriangleValidationError::EmptyMesh
        ))
    );

    let (vertices, _) = unit_square();
    let result = ClusteredMeshBuilder::new(vertices, vec![[0, 1, 7]]).build();
    assert!(matches!(
        result.err(),
        Some(ClusteredMeshBuilderError::InvalidTriangles(
            TriangleValidationError::VertexIndexOutOfBounds { vertex: 7, .. }
        ))
    ));
}

#[test]
fn invalid_parameters_are_rejected() {
    let (vertices, triangles) = unit_square();
    for granularity in [0.0, -1.0, f32::NAN, f32::INFINITY] {
        let params = ClusteredMeshParams {
            granularity,
            ..ClusteredMeshParams::default()
        };
        let result = ClusteredMeshBuilder::new(vertices.clone(), triangles.clone())
            .with_params(params)
            .build();
        assert!(matches!(
            result.err(),
            Some(ClusteredMeshBuilderError::InvalidGranularity(_))
        ));
    }

    let result = ClusteredMeshBuilder::new(vertices, triangles)
        .with_surface_ids(vec![1, 2])
        .build();
    assert_eq!(
        result.err(),
        Some(ClusteredMeshBuilderError::SurfaceIdCountMismatch {
            surface_ids: 2,
            triangles: 3
        })
    );
}

#[test]
fn surface_ids_follow_dropped_triangles() {
    let (vertices, mut triangles) = unit_square();
    // A sliver with three collinear vertices.
    triangles.insert(1, [0, 4, 1]);

    let mesh = ClusteredMeshBuilder::new(vertices, triangles)
        .with_surface_ids(vec![10, 11, 12, 13])
        .build()
        .unwrap();

    assert_eq!(mesh.triangles(), [[0, 4, 3], [4, 1, 2], [4, 2, 3]]);
    assert_eq!(mesh.surface_ids(), [10, 12, 13]);
}

#[cfg(feature = "parallel")]
#[test]
fn parallel_batch_keeps_input_order() {
    use clustered_mesh::build_clustered_meshes;

    let (vertices, triangles) = unit_square();
    let builders = vec![
        ClusteredMeshBuilder::new(vertices.clone(), triangles.clone()),
        ClusteredMeshBuilder::new(vertices.clone(), vec![[0, 0, 0]]),
        ClusteredMeshBuilder::new(vertices, triangles[..1].to_vec()),
    ];

    let results = build_clustered_meshes(builders);
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().triangles().len(), 3);
    assert!(results[1].is_err());
    assert_eq!(results[2].as_ref().unwrap().triangles().len(), 1);
}
