//! Bounding volumes of triangles and KD-tree nodes.

pub use self::aabb::Aabb;
pub use self::bounding_volume::BoundingVolume;

mod aabb;
mod bounding_volume;
