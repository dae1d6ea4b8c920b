/*!
clustered-mesh
==============

**clustered-mesh** turns a triangle soup into a clustered collision mesh: a
surface-area-heuristic KD-tree over the triangles, bounded clusters of
triangles sharing a compressed vertex pool, per-edge adjacency codes, and the
big-endian binary blobs a console-era physics runtime loads directly.

The whole pipeline is driven by [`ClusteredMeshBuilder`]:

```rust
use clustered_mesh::math::Point;
use clustered_mesh::{ClusteredMeshBuilder, ClusteredMeshParams};

let vertices = vec![
    Point::new(0.0, 0.0, 0.0),
    Point::new(1.0, 0.0, 0.0),
    Point::new(1.0, 0.0, 1.0),
    Point::new(0.0, 0.0, 1.0),
];
let triangles = vec![[0, 2, 1], [0, 3, 2]];

let mesh = ClusteredMeshBuilder::new(vertices, triangles)
    .with_params(ClusteredMeshParams::default())
    .build()
    .unwrap();
assert_eq!(mesh.clusters().len(), 1);
let bytes = mesh.to_bytes().unwrap();
assert_eq!(bytes.len() % 16, 0);
```
*/

#![deny(non_camel_case_types)]
#![deny(unused_parens)]
#![deny(non_upper_case_globals)]
#![deny(unused_results)]
#![warn(missing_docs)]
#![warn(unused_imports)]
#![allow(missing_copy_implementations)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::module_inception)]
#![allow(clippy::manual_range_contains)]

extern crate alloc;

#[cfg(feature = "serde-serialize")]
#[macro_use]
extern crate serde;

pub extern crate nalgebra as na;

pub mod bounding_volume;
pub mod cluster;
pub mod mesh;
pub mod partitioning;
pub mod serialization;
pub mod utils;

mod clustered_mesh;

pub use self::clustered_mesh::{
    ClusteredMesh, ClusteredMeshBuilder, ClusteredMeshBuilderError, ClusteredMeshFlags,
    ClusteredMeshParams, ClusteredMeshStatistics,
};
pub use self::mesh::MAX_TRIANGLE_COUNT;
#[cfg(feature = "parallel")]
pub use self::clustered_mesh::build_clustered_meshes;

/// Aliases for the mathematical types used throughout this crate.
pub mod math {
    pub use na::{Point3, Vector3};

    /// The scalar type of vertex positions.
    pub type Real = f32;

    /// The dimension of the space.
    pub const DIM: usize = 3;

    /// The point type.
    pub use Point3 as Point;

    /// The vector type.
    pub use Vector3 as Vector;
}
