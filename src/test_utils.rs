// src/test_utils.rs

//! Closeness checks shared by the unit tests. Everything is `f32`, the
//! scalar the flight targets run on.

use crate::number::wrap_pi;
use crate::rotation::Matrix3;

/// Absolute tolerance under which two `f32` results count as equal.
pub const TEST_TOLERANCE: f32 = 1e-5;

/// `true` if `value` is within `TEST_TOLERANCE` of `target`.
pub fn value_close(target: f32, value: f32) -> bool {
    (target - value).abs() < TEST_TOLERANCE
}

/// `true` if `value` differs from `target` by at least `TEST_TOLERANCE`.
pub fn value_not_close(target: f32, value: f32) -> bool {
    TEST_TOLERANCE <= (target - value).abs()
}

/// Compares two angles in radians modulo 2π.
///
/// # Arguments
/// * `target` - The expected angle.
/// * `value` - The angle under test.
///
/// # Returns
/// `true` if the wrapped difference is within `TEST_TOLERANCE`, so that
/// `π` and `-π` compare equal.
pub fn angle_close(target: f32, value: f32) -> bool {
    wrap_pi(target - value).abs() < TEST_TOLERANCE
}

/// `true` if every component of `value` is within `TEST_TOLERANCE` of the
/// matching component of `target`.
pub fn vector_close(target: (f32, f32, f32), value: (f32, f32, f32)) -> bool {
    vector_close_within(target, value, TEST_TOLERANCE)
}

/// Component-wise comparison with an explicit tolerance, for results that
/// accumulate error over many filter steps.
pub fn vector_close_within(
    target: (f32, f32, f32),
    value: (f32, f32, f32),
    tolerance: f32,
) -> bool {
    (target.0 - value.0).abs() < tolerance
        && (target.1 - value.1).abs() < tolerance
        && (target.2 - value.2).abs() < tolerance
}

/// Element-wise comparison of two matrices.
///
/// # Returns
/// `true` if all nine elements are close as per `value_close`.
pub fn matrix_close(target: &Matrix3<f32>, value: &Matrix3<f32>) -> bool {
    (0..3).all(|row| (0..3).all(|col| value_close(target.get(row, col), value.get(row, col))))
}
