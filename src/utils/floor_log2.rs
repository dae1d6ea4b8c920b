/// The base-2 logarithm of `value`, rounded down.
///
/// Zero is treated as one, so the result is always defined.
#[inline]
pub fn floor_log2(value: u32) -> u32 {
    31 - value.max(1).leading_zeros()
}
