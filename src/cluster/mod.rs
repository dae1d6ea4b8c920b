//! Grouping of triangles into clusters sharing a compressed vertex pool.

pub use self::cluster_walker::{build_clusters, ClusterLayout};
pub use self::unit_cluster::{
    ClusterError, UnitCluster, MAX_CLUSTER_UNITS, MAX_CLUSTER_VERTICES, UNIT_SIZE,
    UNIT_VERTEX_BUDGET,
};
pub use self::vertex_compression::{
    decode_int16, decode_int32, encode_int16, encode_int32, quantize, resolve_compression_mode,
    select_compression_mode, CompressionMode, INT16_MAX_RANGE,
};

mod cluster_walker;
mod unit_cluster;
mod vertex_compression;
