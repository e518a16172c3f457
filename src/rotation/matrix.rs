// src/rotation/matrix.rs

//! # Fixed-Size 3x3 Matrix
//!
//! A small value type for direction cosine matrices. No allocation, no
//! dynamic dimensions. Vectors are `(x, y, z)` tuples, matching the rest of
//! the crate.

use crate::number::{real, Number, Real};
use core::ops::Mul;
use num_traits::Float;

/// Row-major 3x3 matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix3<T> {
    rows: [[T; 3]; 3],
}

/// Dot product of two 3-vectors.
pub fn dot<T: Real>(a: (T, T, T), b: (T, T, T)) -> T {
    a.0 * b.0 + a.1 * b.1 + a.2 * b.2
}

/// Cross product `a × b`.
pub fn cross<T: Real>(a: (T, T, T), b: (T, T, T)) -> (T, T, T) {
    (
        a.1 * b.2 - a.2 * b.1,
        a.2 * b.0 - a.0 * b.2,
        a.0 * b.1 - a.1 * b.0,
    )
}

/// Scales a vector to unit length. Returns `None` for vectors too short to
/// have a meaningful direction, or with non-finite components.
pub fn normalize<T: Real>(v: (T, T, T)) -> Option<(T, T, T)> {
    let norm = Float::sqrt(dot(v, v));
    if Float::is_finite(norm) && norm > real(1e-9) {
        Some((v.0 / norm, v.1 / norm, v.2 / norm))
    } else {
        None
    }
}

impl<T: Real> Matrix3<T> {
    /// Builds a matrix from its rows.
    pub fn from_rows(rows: [[T; 3]; 3]) -> Self {
        Self { rows }
    }

    /// The identity matrix.
    pub fn identity() -> Self {
        let (o, l) = (T::zero(), T::one());
        Self::from_rows([[l, o, o], [o, l, o], [o, o, l]])
    }

    /// Direction cosine matrix transforming FROM the inertial frame TO the
    /// body frame for the given Z-Y-X Euler angles, in radians.
    pub fn from_euler(roll: T, pitch: T, yaw: T) -> Self {
        let (sr, cr) = Float::sin_cos(roll);
        let (sp, cp) = Float::sin_cos(pitch);
        let (sy, cy) = Float::sin_cos(yaw);
        Self::from_rows([
            [cp * cy, cp * sy, -sp],
            [-cr * sy + sr * sp * cy, cr * cy + sr * sp * sy, sr * cp],
            [sr * sy + cr * sp * cy, -sr * cy + cr * sp * sy, cr * cp],
        ])
    }

    /// Rotation of `angle` radians around the unit vector `axis`
    /// (Rodrigues' formula).
    pub fn from_axis_angle(axis: (T, T, T), angle: T) -> Self {
        let (s, c) = Float::sin_cos(angle);
        let t = T::one() - c;
        let (x, y, z) = axis;
        Self::from_rows([
            [c + x * x * t, x * y * t - z * s, x * z * t + y * s],
            [y * x * t + z * s, c + y * y * t, y * z * t - x * s],
            [z * x * t - y * s, z * y * t + x * s, c + z * z * t],
        ])
    }

    /// Element at `row`, `col` (zero based).
    pub fn get(&self, row: usize, col: usize) -> T {
        self.rows[row][col]
    }

    /// The rows of the matrix.
    pub fn rows(&self) -> [[T; 3]; 3] {
        self.rows
    }

    /// Matrix transpose. For a rotation matrix this is also the inverse.
    pub fn transpose(&self) -> Self {
        let m = &self.rows;
        Self::from_rows([
            [m[0][0], m[1][0], m[2][0]],
            [m[0][1], m[1][1], m[2][1]],
            [m[0][2], m[1][2], m[2][2]],
        ])
    }

    /// Matrix-vector product.
    pub fn mul_vector(&self, v: (T, T, T)) -> (T, T, T) {
        let m = &self.rows;
        (
            m[0][0] * v.0 + m[0][1] * v.1 + m[0][2] * v.2,
            m[1][0] * v.0 + m[1][1] * v.1 + m[1][2] * v.2,
            m[2][0] * v.0 + m[2][1] * v.1 + m[2][2] * v.2,
        )
    }

    /// Extracts Z-Y-X Euler angles `(roll, pitch, yaw)` from a
    /// body-from-inertial rotation matrix. The `asin` argument is clamped,
    /// so pitch saturates at ±π/2 where roll and yaw are no longer separable.
    pub fn euler_angles(&self) -> (T, T, T) {
        let m = &self.rows;
        let roll = Float::atan2(m[1][2], m[2][2]);
        let pitch = Float::asin(Number::clamp(-m[0][2], -T::one(), T::one()));
        let yaw = Float::atan2(m[0][1], m[0][0]);
        (roll, pitch, yaw)
    }

    /// Largest absolute deviation of `M · Mᵀ` from the identity.
    pub fn orthonormality_error(&self) -> T {
        let product = *self * self.transpose();
        let identity = Self::identity();
        let mut worst = T::zero();
        for row in 0..3 {
            for col in 0..3 {
                let deviation = Float::abs(product.rows[row][col] - identity.rows[row][col]);
                worst = Float::max(worst, deviation);
            }
        }
        worst
    }

    /// Returns an orthonormal matrix close to `self`. The error between the
    /// first two rows is split evenly between them, the third row is rebuilt
    /// as their cross product and every row is normalized.
    pub fn orthonormalized(&self) -> Self {
        let row = |i: usize| (self.rows[i][0], self.rows[i][1], self.rows[i][2]);
        let (x, y) = (row(0), row(1));
        let half_error = dot(x, y) / real(2.0);
        let x = (
            x.0 - half_error * y.0,
            x.1 - half_error * y.1,
            x.2 - half_error * y.2,
        );
        let y = (
            y.0 - half_error * row(0).0,
            y.1 - half_error * row(0).1,
            y.2 - half_error * row(0).2,
        );
        let z = cross(x, y);
        match (normalize(x), normalize(y), normalize(z)) {
            (Some(x), Some(y), Some(z)) => {
                Self::from_rows([[x.0, x.1, x.2], [y.0, y.1, y.2], [z.0, z.1, z.2]])
            }
            // Rows collapsed; nothing sensible to recover.
            _ => Self::identity(),
        }
    }
}

impl<T: Real> Mul for Matrix3<T> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let (a, b) = (&self.rows, &rhs.rows);
        let mut rows = [[T::zero(); 3]; 3];
        for (row, out) in rows.iter_mut().enumerate() {
            for (col, value) in out.iter_mut().enumerate() {
                *value = a[row][0] * b[0][col] + a[row][1] * b[1][col] + a[row][2] * b[2][col];
            }
        }
        Self::from_rows(rows)
    }
}

impl<T: Real> Default for Matrix3<T> {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use core::f32::consts::{FRAC_PI_2, PI};

    const TRIPLES: [(f32, f32, f32); 6] = [
        (0.0, 0.0, 0.0),
        (0.3, -0.2, 1.0),
        (-1.2, 0.7, -2.5),
        (PI, 0.1, -PI),
        (0.5, FRAC_PI_2, 0.25),
        (2.9, -1.4, 3.0),
    ];

    /// DCM · DCMᵀ must be the identity for any Euler triple.
    #[test]
    fn test_matrix_orthonormality_round_trip() {
        for (roll, pitch, yaw) in TRIPLES {
            let dcm = Matrix3::from_euler(roll, pitch, yaw);
            let product = dcm * dcm.transpose();
            assert!(
                matrix_close(&Matrix3::identity(), &product),
                "DCM·DCMᵀ deviates from identity for {:?}",
                (roll, pitch, yaw)
            );
            assert!(dcm.orthonormality_error() < TEST_TOLERANCE);
        }
    }

    /// Euler extraction inverts construction away from gimbal lock.
    #[test]
    fn test_matrix_euler_round_trip() {
        let angles = (0.4, -0.6, 2.2);
        let dcm = Matrix3::from_euler(angles.0, angles.1, angles.2);
        assert!(vector_close(angles, dcm.euler_angles()));
    }

    /// Pitch at exactly ±90° must not produce NaN.
    #[test]
    fn test_matrix_euler_gimbal_lock_is_finite() {
        let dcm = Matrix3::from_euler(0.2, FRAC_PI_2, 0.1);
        let (roll, pitch, yaw) = dcm.euler_angles();
        assert!(roll.is_finite() && pitch.is_finite() && yaw.is_finite());
        assert!(value_close(FRAC_PI_2, pitch));
    }

    /// A rotation about z by yaw equals the Euler DCM with only yaw set.
    #[test]
    fn test_matrix_axis_angle_matches_euler_yaw() {
        let yaw = 0.7;
        let axis_angle = Matrix3::from_axis_angle((0.0, 0.0, -1.0), yaw);
        let euler = Matrix3::from_euler(0.0, 0.0, yaw);
        assert!(matrix_close(&euler, &axis_angle));
    }

    #[test]
    fn test_matrix_transpose_inverts_vector_transform() {
        let dcm = Matrix3::from_euler(0.3, 0.2, -0.9);
        let v = (1.0, -2.0, 0.5);
        let round_trip = dcm.transpose().mul_vector(dcm.mul_vector(v));
        assert!(vector_close(v, round_trip));
    }

    #[test]
    fn test_matrix_orthonormalize_reduces_drift() {
        let mut rows = Matrix3::from_euler(0.3_f32, 0.2, -0.9).rows();
        rows[0][1] += 0.01;
        rows[1][0] -= 0.02;
        rows[2][2] *= 1.01;
        let drifted = Matrix3::from_rows(rows);
        assert!(drifted.orthonormality_error() > 1e-3);

        let repaired = drifted.orthonormalized();
        assert!(repaired.orthonormality_error() < 1e-3);
    }

    #[test]
    fn test_vector_helpers() {
        assert!(vector_close(
            (0.0, 0.0, 1.0),
            cross((1.0, 0.0, 0.0), (0.0, 1.0, 0.0))
        ));
        assert!(value_close(32.0, dot((1.0, 2.0, 3.0), (4.0, 5.0, 6.0))));
        assert!(normalize((0.0_f32, 0.0, 0.0)).is_none());
        let unit = normalize((3.0_f32, 0.0, 4.0)).unwrap();
        assert!(vector_close((0.6, 0.0, 0.8), unit));
    }
}
