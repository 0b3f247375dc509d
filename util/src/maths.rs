//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Clamp a value between a minimum and maximum.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float,
{
    value.max(min).min(max)
}

/// Wrap an angle in radians into the range (-pi, pi].
///
/// Any number of whole turns is removed in a single step, so the result is
/// the same as repeatedly subtracting `2 * pi * sign(angle)` while
/// `|angle| > pi`, except that `-pi` maps onto `+pi`.
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float,
{
    let pi_t = T::from(std::f64::consts::PI).unwrap();
    let tau_t = T::from(std::f64::consts::TAU).unwrap();

    let wrapped = rem_euclid(angle, tau_t);

    if wrapped > pi_t {
        wrapped - tau_t
    } else {
        wrapped
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()` if `lhs` is much smaller than `rhs.abs()` in
/// magnitude and `lhs < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}
