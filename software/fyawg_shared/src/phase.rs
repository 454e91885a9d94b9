//! Phase offset between the two channels

/// Degrees in a full turn
pub const FULL_TURN_DEG: f64 = 360.0;

/// Wrap a negative phase offset into `[0, 360)` degrees.
///
/// Equivalent to adding 360 until the value is no longer negative.
/// Non-negative values, including those of 360 and above, are returned as-is,
/// and so are non-finite values.
pub fn normalize_phase(phase: f64) -> f64 {
    if !phase.is_finite() || phase >= 0.0 {
        return phase;
    }

    // In (-360, 0]
    let wrapped = phase % FULL_TURN_DEG;
    if wrapped < 0.0 {
        wrapped + FULL_TURN_DEG
    } else {
        0.0
    }
}
