// src/number.rs

//! # Numeric Support
//!
//! Scalar trait bounds shared by the estimator, rotation and PID modules.
//! Everything in the crate is generic over the scalar so the same code runs
//! on `f32` targets and `f64` hosts.

use core::fmt::{Debug, Display};
use num_traits::{Float, FloatConst, NumCast};
use piddiy::Number as PiddiyNumber;

/// Custom trait to encapsulate base number requirements.
pub trait Number: PiddiyNumber {
    /// Clamps generic PartialOrd values within a given range.
    fn clamp(self, min: Self, max: Self) -> Self {
        if self < min {
            min
        } else if max < self {
            max
        } else {
            self
        }
    }
}

impl<T: PiddiyNumber> Number for T {}

/// Floating point scalar with the trigonometry needed for attitude math.
pub trait Real: Number + Float + FloatConst + Default + Debug + Display {}

impl<T> Real for T where T: Number + Float + FloatConst + Default + Debug + Display {}

/// Converts an `f32` constant into the scalar type.
pub fn real<T: Real>(value: f32) -> T {
    <T as NumCast>::from(value).unwrap_or_else(T::zero)
}

/// Wraps an angle in radians into `[-π, π]`.
pub fn wrap_pi<T: Real>(angle: T) -> T {
    let pi = T::PI();
    let two_pi = pi + pi;
    if angle > pi || angle < -pi {
        let wrapped = angle - two_pi * Float::floor((angle + pi) / two_pi);
        // floor() can land exactly on +π for inputs like 3π.
        if wrapped > pi {
            wrapped - two_pi
        } else {
            wrapped
        }
    } else {
        angle
    }
}

/// Returns `true` if every component of the vector is finite.
pub fn all_finite<T: Real>(vector: (T, T, T)) -> bool {
    Float::is_finite(vector.0) && Float::is_finite(vector.1) && Float::is_finite(vector.2)
}

/// Euclidean norm of a 3-vector.
pub fn norm<T: Real>(vector: (T, T, T)) -> T {
    Float::sqrt(vector.0 * vector.0 + vector.1 * vector.1 + vector.2 * vector.2)
}
