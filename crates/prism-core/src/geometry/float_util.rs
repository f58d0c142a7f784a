//! Tolerance helpers for `f64` comparisons.
//!
//! Exact comparison is wrong for values produced by arithmetic; these helpers
//! scale the tolerance with machine epsilon instead.

/// Ten machine epsilons: the absolute tolerance used by [`is_zero`].
pub const ZERO_TOLERANCE: f64 = 10.0 * f64::EPSILON;

/// `true` when `value` is within [`ZERO_TOLERANCE`] of zero.
#[inline]
pub fn is_zero(value: f64) -> bool {
    value.abs() < ZERO_TOLERANCE
}

/// Relative comparison: the tolerance grows with the magnitude of the inputs.
#[inline]
pub fn are_close(a: f64, b: f64) -> bool {
    // Also covers equal infinities.
    if a == b {
        return true;
    }
    let eps = (a.abs() + b.abs() + 10.0) * f64::EPSILON;
    let delta = a - b;
    -eps < delta && eps > delta
}
