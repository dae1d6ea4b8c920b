use crate::mesh::TriangleNeighbors;
use alloc::vec::Vec;
use core::f32::consts::PI;

/// The angle byte of a flat (or concave) edge.
pub const EDGE_ANGLE_ZERO: u8 = 0x1A;

/// Angles below this value, in radians, are quantized as if they were this value.
pub const MIN_EDGE_ANGLE: f32 = 6.6e-5;

/// Packed adjacency information of one triangle edge.
///
/// The low five bits store a quantized angle (see [`edge_cosine_to_angle_byte`]), the high three
/// bits are flags.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct EdgeCode(u8);

bitflags::bitflags! {
    impl EdgeCode: u8 {
        /// Mask of the quantized edge angle.
        const ANGLE_MASK = 0x1F;
        /// The edge is convex.
        const CONVEX = 0x20;
        /// The edge isn't shared with any other triangle.
        const UNMATCHED = 0x40;
        /// Collisions against the vertex starting this edge are disabled.
        const VERTEX_DISABLED = 0x80;
    }
}

impl EdgeCode {
    /// The quantized angle stored in the low bits of this code.
    #[inline]
    pub fn angle_byte(self) -> u8 {
        self.bits() & Self::ANGLE_MASK.bits()
    }

    /// The code of an edge with the given angle byte and no flags.
    #[inline]
    pub fn from_angle_byte(angle: u8) -> Self {
        Self::from_bits_retain(angle & Self::ANGLE_MASK.bits())
    }
}

/// Quantizes an extended edge cosine into a five-bit angle byte.
///
/// The cosine is clamped to `[-1, 1]`, turned into an angle `θ` (floored at
/// [`MIN_EDGE_ANGLE`]), and quantized logarithmically as `-2 log2(θ / π)`, clamped to
/// `[0, 26]`. Flat and concave edges map to [`EDGE_ANGLE_ZERO`].
pub fn edge_cosine_to_angle_byte(edge_cosine: f32) -> u8 {
    let angle = edge_cosine.clamp(-1.0, 1.0).acos().max(MIN_EDGE_ANGLE);
    let quantized = -2.0 * (angle / PI).log2();
    quantized.clamp(0.0, EDGE_ANGLE_ZERO as f32) as u8
}

/// Computes the code of a single edge from its extended cosine and whether it has a neighbor.
pub fn edge_code(edge_cosine: f32, matched: bool) -> EdgeCode {
    let mut code = if edge_cosine > 3.0 {
        EdgeCode::from_angle_byte(EDGE_ANGLE_ZERO)
    } else {
        EdgeCode::from_angle_byte(edge_cosine_to_angle_byte(edge_cosine))
    };

    if edge_cosine < 1.0 {
        code |= EdgeCode::CONVEX;
    }

    if !matched {
        code |= EdgeCode::UNMATCHED;
    }

    code
}

/// Computes the edge codes of every edge of every triangle.
pub fn generate_edge_codes(neighbors: &TriangleNeighbors) -> Vec<[EdgeCode; 3]> {
    (0..neighbors.len() as u32)
        .map(|tid| {
            [0, 1, 2].map(|edge| {
                edge_code(
                    neighbors.edge_cosine(tid, edge),
                    neighbors.neighbor(tid, edge).is_some(),
                )
            })
        })
        .collect()
}
