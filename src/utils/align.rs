/// The alignment, in bytes, of every section of the serialized blobs.
pub const QUAD_WORD: usize = 16;

/// Rounds `offset` up to the next multiple of `alignment`.
///
/// `alignment` must be a power of two.
#[inline]
pub fn align_up(offset: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    (offset + alignment - 1) & !(alignment - 1)
}

/// Is `offset` a multiple of `alignment`?
#[inline]
pub fn is_aligned(offset: usize, alignment: usize) -> bool {
    debug_assert!(alignment.is_power_of_two());
    offset & (alignment - 1) == 0
}
