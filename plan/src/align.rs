//! Integer alignment helpers shared by the tiling planners.
//!
//! All divisors are block or repeat granularities and therefore positive;
//! callers guarantee this via [`ResourceProfile::validate`].
//!
//! [`ResourceProfile::validate`]: tessara_platform::ResourceProfile::validate

/// Ceiling division.
pub const fn ceil_div(a: i64, b: i64) -> i64 {
    (a + b - 1) / b
}

/// Round `a` up to the next multiple of `b`.
pub const fn ceil_align(a: i64, b: i64) -> i64 {
    ceil_div(a, b) * b
}

/// Round `a` down to a multiple of `b`.
pub const fn floor_align(a: i64, b: i64) -> i64 {
    (a / b) * b
}
