//! Various unsorted arithmetic and geometric helpers.

pub use self::align::{align_up, is_aligned, QUAD_WORD};
pub use self::floor_log2::floor_log2;
pub(crate) use self::triangle_normal::{to_f64, triangle_cross, unit_triangle_normal};

mod align;
mod floor_log2;
mod triangle_normal;
