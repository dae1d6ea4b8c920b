use crate::math::{Point, Real, DIM};

/// Largest per-axis range of quantized coordinates the 16-bit mode accepts.
pub const INT16_MAX_RANGE: i64 = 65534;

/// How the vertices of a cluster are stored.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum CompressionMode {
    /// Plain `f32` coordinates.
    #[default]
    Uncompressed,
    /// Unsigned 16-bit lattice coordinates relative to a per-cluster offset.
    Int16 {
        /// The lattice offset added to every decoded coordinate.
        offset: [i32; 3],
    },
    /// Signed 32-bit lattice coordinates.
    Int32,
}

impl CompressionMode {
    /// The byte identifying this mode in serialized clusters.
    pub fn mode_byte(&self) -> u8 {
        match self {
            CompressionMode::Uncompressed => 0,
            CompressionMode::Int16 { .. } => 1,
            CompressionMode::Int32 => 2,
        }
    }

    /// The size in bytes of the vertex payload of a cluster with `num_vertices` vertices,
    /// before padding.
    pub fn payload_size(&self, num_vertices: usize) -> usize {
        match self {
            CompressionMode::Uncompressed => 16 * num_vertices,
            CompressionMode::Int16 { .. } => 12 + 6 * num_vertices,
            CompressionMode::Int32 => 12 * num_vertices,
        }
    }

    /// The less compact mode this one falls back to on overflow.
    pub fn fallback(&self) -> Option<CompressionMode> {
        match self {
            CompressionMode::Int16 { .. } => Some(CompressionMode::Int32),
            CompressionMode::Int32 => Some(CompressionMode::Uncompressed),
            CompressionMode::Uncompressed => None,
        }
    }

    /// Can every point be encoded with this mode?
    pub fn can_encode<'a>(
        &self,
        mut points: impl Iterator<Item = &'a Point<Real>>,
        granularity: Real,
    ) -> bool {
        match self {
            CompressionMode::Uncompressed => true,
            CompressionMode::Int16 { offset } => {
                points.all(|pt| encode_int16(pt, offset, granularity).is_some())
            }
            CompressionMode::Int32 => points.all(|pt| encode_int32(pt, granularity).is_some()),
        }
    }
}

/// The lattice coordinate of `value`: `value / granularity` truncated toward zero.
#[inline]
pub fn quantize(value: Real, granularity: Real) -> i64 {
    (value as f64 / granularity as f64).trunc() as i64
}

/// Encodes a point in the 16-bit mode. `None` if it doesn't fit.
pub fn encode_int16(pt: &Point<Real>, offset: &[i32; 3], granularity: Real) -> Option<[u16; 3]> {
    let mut result = [0; 3];
    for i in 0..DIM {
        let value = quantize(pt[i], granularity).checked_sub(offset[i] as i64)?;
        result[i] = u16::try_from(value).ok()?;
    }
    Some(result)
}

/// Encodes a point in the 32-bit mode. `None` if it doesn't fit.
pub fn encode_int32(pt: &Point<Real>, granularity: Real) -> Option<[i32; 3]> {
    let mut result = [0; 3];
    for i in 0..DIM {
        result[i] = i32::try_from(quantize(pt[i], granularity)).ok()?;
    }
    Some(result)
}

/// Decodes a point encoded in the 16-bit mode.
pub fn decode_int16(coords: &[u16; 3], offset: &[i32; 3], granularity: Real) -> Point<Real> {
    Point::from(core::array::from_fn::<_, 3, _>(|i| {
        ((coords[i] as i64 + offset[i] as i64) as f64 * granularity as f64) as Real
    }))
}

/// Decodes a point encoded in the 32-bit mode.
pub fn decode_int32(coords: &[i32; 3], granularity: Real) -> Point<Real> {
    Point::from(core::array::from_fn::<_, 3, _>(|i| {
        (coords[i] as f64 * granularity as f64) as Real
    }))
}

/// Picks the most compact mode for the given cluster vertices.
///
/// The 16-bit mode is chosen when the quantized coordinates span less than
/// [`INT16_MAX_RANGE`] on every axis, with the offset set one below their minimum. The 32-bit
/// mode is chosen otherwise. An empty vertex set is left uncompressed.
pub fn select_compression_mode<'a>(
    points: impl IntoIterator<Item = &'a Point<Real>>,
    granularity: Real,
) -> CompressionMode {
    let mut mins = [i64::MAX; 3];
    let mut maxs = [i64::MIN; 3];
    let mut empty = true;

    for pt in points {
        empty = false;
        for i in 0..DIM {
            let value = quantize(pt[i], granularity);
            mins[i] = mins[i].min(value);
            maxs[i] = maxs[i].max(value);
        }
    }

    if empty {
        return CompressionMode::Uncompressed;
    }

    // Saturated lattice values make these differences overflow: such ranges are never 16-bit.
    let fits_int16 = (0..DIM).all(|i| {
        maxs[i]
            .checked_sub(mins[i])
            .is_some_and(|range| range < INT16_MAX_RANGE)
    });

    if fits_int16 {
        let offset = [0usize, 1, 2].map(|i| {
            mins[i]
                .checked_sub(1)
                .and_then(|min| i32::try_from(min).ok())
        });
        if let [Some(x), Some(y), Some(z)] = offset {
            return CompressionMode::Int16 { offset: [x, y, z] };
        }
    }

    CompressionMode::Int32
}

/// Returns the first mode of the fallback chain starting at `mode` able to encode every point.
///
/// Each fallback is logged as a warning.
pub fn resolve_compression_mode<'a>(
    mode: CompressionMode,
    points: impl Iterator<Item = &'a Point<Real>> + Clone,
    granularity: Real,
    cluster_id: u32,
) -> CompressionMode {
    let mut mode = mode;

    while !mode.can_encode(points.clone(), granularity) {
        let Some(fallback) = mode.fallback() else {
            break;
        };
        log::warn!(
            "Cluster {}: vertices overflow the {:?} compression mode, falling back to {:?}.",
            cluster_id,
            mode,
            fallback
        );
        mode = fallback;
    }

    mode
}
