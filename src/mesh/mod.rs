//! Triangle validation and per-edge adjacency metadata.
//!
//! These are the first stages of the clustered mesh pipeline: degenerate triangles are dropped,
//! every edge is matched with at most one neighbor edge, and the resulting adjacency is packed
//! into one [`EdgeCode`] per triangle edge.

pub use self::edge_codes::{
    edge_code, edge_cosine_to_angle_byte, generate_edge_codes, EdgeCode, EDGE_ANGLE_ZERO,
    MIN_EDGE_ANGLE,
};
pub use self::triangle_neighbors::{
    extended_edge_cosine, find_triangle_neighbors, TriangleNeighbors, VertexTriangleMap,
    NO_NEIGHBOR, UNMATCHED_EDGE_COSINE,
};
pub use self::triangle_validator::{
    check_triangle_indices, is_triangle_valid, valid_triangle_ids, validate_triangles,
    TriangleValidationError, DEGENERATE_TRIANGLE_EPSILON, MAX_TRIANGLE_COUNT,
};
pub use self::vertex_smoothing::{is_non_feature_vertex, smooth_vertices};

mod edge_codes;
mod triangle_neighbors;
mod triangle_validator;
mod vertex_smoothing;
