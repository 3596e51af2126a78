//! Offset arithmetic along a normalized curve domain.

/// Brings `x` into the unit domain.
///
/// Circular offsets wrap with a true modulo into `[0, 1)`, negative values
/// included. Non-circular offsets are clamped into `[0, 1]`.
#[must_use]
pub fn normalize_offset(x: f64, circular: bool) -> f64 {
    if circular {
        // Tiny negative inputs round up to exactly 1.0.
        let wrapped = x - x.floor();
        if wrapped >= 1.0 { 0.0 } else { wrapped }
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Expresses an absolute length as a fraction of `total_length`.
#[must_use]
pub fn to_relative(absolute_length: f64, total_length: f64) -> f64 {
    debug_assert!(total_length != 0.0, "relative length against a zero-length curve");
    absolute_length / total_length
}
