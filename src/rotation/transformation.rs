// src/rotation/transformation.rs

//! # Orientation Tracking and Absolute Attitude
//!
//! `RotationTransformation` holds the direction cosine matrix built from the
//! fused attitude estimate together with its inverse. The free functions
//! derive absolute attitude measurements from a single reference vector
//! (magnetic field or gravity) observed in the body frame.

use super::matrix::{cross, dot, normalize, Matrix3};
use crate::error::{Error, Result};
use crate::logging::log_debug;
use crate::number::{real, wrap_pi, Number, Real};
use num_traits::Float;

/// Orthonormality error above which the DCM is repaired before use.
pub const ORTHONORMALITY_TOLERANCE: f32 = 1e-4;

/// Direction cosine matrix and its inverse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationTransformation<T> {
    dcm: Matrix3<T>,
    dcm_inverse: Matrix3<T>,
    repairs: u32,
}

impl<T: Real> RotationTransformation<T> {
    /// Creates a level orientation: both matrices are the identity.
    pub fn new() -> Self {
        Self {
            dcm: Matrix3::identity(),
            dcm_inverse: Matrix3::identity(),
            repairs: 0,
        }
    }

    /// Rebuilds the DCM from roll, pitch and yaw in radians. The inverse is
    /// the transpose, never a numerical inverse.
    pub fn update(&mut self, roll: T, pitch: T, yaw: T) {
        self.install(Matrix3::from_euler(roll, pitch, yaw));
    }

    /// Stores `dcm` and its transpose. A matrix built from Euler angles is
    /// orthonormal up to rounding, so the repair is a guard against degraded
    /// trigonometry and should never count up in normal operation.
    fn install(&mut self, mut dcm: Matrix3<T>) {
        if dcm.orthonormality_error() > real(ORTHONORMALITY_TOLERANCE) {
            dcm = dcm.orthonormalized();
            self.repairs = self.repairs.wrapping_add(1);
            log_debug!("dcm re-orthonormalized, repairs = {}", self.repairs);
        }
        self.dcm = dcm;
        self.dcm_inverse = dcm.transpose();
    }

    /// Matrix transforming FROM the inertial frame TO the body frame.
    pub fn dcm(&self) -> &Matrix3<T> {
        &self.dcm
    }

    /// Matrix transforming FROM the body frame TO the inertial frame.
    pub fn dcm_inverse(&self) -> &Matrix3<T> {
        &self.dcm_inverse
    }

    /// Number of times the DCM had to be re-orthonormalized.
    pub fn repairs(&self) -> u32 {
        self.repairs
    }

    /// Expresses an inertial-frame vector in the body frame.
    pub fn inertial_to_body(&self, v: (T, T, T)) -> (T, T, T) {
        self.dcm.mul_vector(v)
    }

    /// Expresses a body-frame vector in the inertial frame.
    pub fn body_to_inertial(&self, v: (T, T, T)) -> (T, T, T) {
        self.dcm_inverse.mul_vector(v)
    }
}

impl<T: Real> Default for RotationTransformation<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Calculates `(roll, pitch, yaw)` from a magnetometer reading.
///
/// The rotation taking the inertial magnetic field onto the body reading is
/// found in axis/angle form: the normalized cross product gives the axis and
/// the arccosine of the dot product gives the angle. The rotation matrix is
/// rebuilt with Rodrigues' formula and the Euler angles are extracted from it.
///
/// A single vector only fixes the rotation whose axis is perpendicular to the
/// reference; rotations about the field direction itself are not observable.
/// Parallel vectors yield zero angles. Anti-parallel or zero-length vectors
/// are rejected.
pub fn attitude_from_magnetometer<T: Real>(
    body_field: (T, T, T),
    inertial_field: (T, T, T),
) -> Result<(T, T, T)> {
    let body = normalize(body_field).ok_or(Error::DegenerateVector)?;
    let inertial = normalize(inertial_field).ok_or(Error::DegenerateVector)?;

    let cos_angle = Number::clamp(dot(inertial, body), -T::one(), T::one());
    let axis = match normalize(cross(inertial, body)) {
        Some(axis) => axis,
        None if cos_angle > T::zero() => return Ok((T::zero(), T::zero(), T::zero())),
        None => return Err(Error::DegenerateVector),
    };
    let angle = Float::acos(cos_angle);

    Ok(Matrix3::from_axis_angle(axis, angle).euler_angles())
}

/// Calculates `(roll, pitch)` from an accelerometer reading at rest.
///
/// The accelerometer measures specific force, which points away from the
/// earth, so gravity in the body frame is its negation.
pub fn tilt_from_accelerometer<T: Real>(specific_force: (T, T, T)) -> Result<(T, T)> {
    let (gx, gy, gz) = normalize(specific_force).ok_or(Error::DegenerateVector)?;
    let (gx, gy, gz) = (-gx, -gy, -gz);
    let roll = Float::atan2(gy, gz);
    let pitch = Float::atan2(-gx, Float::sqrt(gy * gy + gz * gz));
    Ok((roll, pitch))
}

/// Calculates yaw from a magnetometer reading, compensating for the given
/// roll and pitch. The body reading is rotated back to level and its
/// horizontal direction compared with that of the inertial field.
pub fn heading_from_magnetometer<T: Real>(
    body_field: (T, T, T),
    inertial_field: (T, T, T),
    roll: T,
    pitch: T,
) -> Result<T> {
    let tilt = Matrix3::from_euler(roll, pitch, T::zero());
    let level = tilt.transpose().mul_vector(body_field);

    let horizontal = |v: (T, T, T)| Float::sqrt(v.0 * v.0 + v.1 * v.1);
    let minimum = real(1e-9);
    if !(horizontal(level) > minimum && horizontal(inertial_field) > minimum) {
        return Err(Error::DegenerateVector);
    }

    let reference = Float::atan2(inertial_field.1, inertial_field.0);
    let measured = Float::atan2(level.1, level.0);
    Ok(wrap_pi(reference - measured))
}
