//! Shared utility functions

/// Normalize angle to [0, 360) degrees
#[inline]
pub fn normalize_degrees(angle: f64) -> f64 {
    let a = angle.rem_euclid(360.0);
    // rem_euclid rounds tiny negatives up to exactly 360.0
    if a >= 360.0 { 0.0 } else { a }
}

/// Map a difference of two normalized angles into (-180, 180] degrees.
///
/// Inputs are expected in [0, 360), so the raw difference lies in (-360, 360)
/// and a single correction of ±360 is enough.
#[inline]
pub fn normalize_180(diff: f64) -> f64 {
    let d = diff % 360.0;
    if d > 180.0 {
        d - 360.0
    } else if d <= -180.0 {
        d + 360.0
    } else {
        d
    }
}
