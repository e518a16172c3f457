// src/sensor/correction.rs

//! # Correction Sources
//!
//! Strategies that turn one accelerometer/magnetometer sample into absolute
//! angles for the estimator's correction step. The consumer task runs one of
//! them per accel/mag sample.

use crate::error::Result;
use crate::estimator::AngleMeasurement;
use crate::number::Real;
use crate::rotation::{
    attitude_from_magnetometer, heading_from_magnetometer, tilt_from_accelerometer,
};

/// One accelerometer/magnetometer sample in the body frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AccelMagSample<T> {
    /// Specific force, m/s². Reads `(0, 0, -g)` when level and at rest.
    pub acceleration: (T, T, T),
    /// Magnetic field. Units do not matter, only direction.
    pub magnetic_field: (T, T, T),
}

/// Derives absolute angles from an accelerometer/magnetometer sample.
pub trait CorrectionSource<T> {
    /// Returns the angles observable from `sample`.
    fn measure(&self, sample: &AccelMagSample<T>) -> Result<AngleMeasurement<T>>;
}

/// Roll and pitch from the gravity direction. Yaw is not observable.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AccelerometerTilt;

impl<T: Real> CorrectionSource<T> for AccelerometerTilt {
    fn measure(&self, sample: &AccelMagSample<T>) -> Result<AngleMeasurement<T>> {
        let (roll, pitch) = tilt_from_accelerometer(sample.acceleration)?;
        Ok(AngleMeasurement::tilt(roll, pitch))
    }
}

/// All three angles from the rotation between the inertial and measured
/// magnetic field. Only exact for rotations about an axis perpendicular to
/// the field, since one vector cannot constrain rotation about itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagnetometerAttitude<T> {
    /// Earth magnetic field in the inertial frame.
    pub inertial_field: (T, T, T),
}

impl<T: Real> CorrectionSource<T> for MagnetometerAttitude<T> {
    fn measure(&self, sample: &AccelMagSample<T>) -> Result<AngleMeasurement<T>> {
        let (roll, pitch, yaw) =
            attitude_from_magnetometer(sample.magnetic_field, self.inertial_field)?;
        Ok(AngleMeasurement::full(roll, pitch, yaw))
    }
}

/// Roll and pitch from gravity, yaw from the magnetic field projected onto
/// the level plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TiltCompensatedCompass<T> {
    /// Earth magnetic field in the inertial frame.
    pub inertial_field: (T, T, T),
}

impl<T: Real> CorrectionSource<T> for TiltCompensatedCompass<T> {
    fn measure(&self, sample: &AccelMagSample<T>) -> Result<AngleMeasurement<T>> {
        let (roll, pitch) = tilt_from_accelerometer(sample.acceleration)?;
        let yaw = heading_from_magnetometer(sample.magnetic_field, self.inertial_field, roll, pitch)?;
        Ok(AngleMeasurement::full(roll, pitch, yaw))
    }
}
