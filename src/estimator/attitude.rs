// src/estimator/attitude.rs

//! # Three-Axis Attitude Estimator
//!
//! Holds one Kalman filter per axis. Prediction consumes body rates from the
//! gyro; correction consumes whichever absolute angles the active correction
//! source was able to produce.

use crate::config::EstimatorConfig;
use crate::error::{Error, Result};
use crate::estimator::kalman::{AttitudeVector, KalmanState};
use crate::logging::log_warn;
use crate::number::{all_finite, Real};
use num_traits::Float;

/// Absolute angle measurement from a correction source. Axes the source
/// cannot observe are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AngleMeasurement<T> {
    /// Roll angle in radians.
    pub roll: Option<T>,
    /// Pitch angle in radians.
    pub pitch: Option<T>,
    /// Yaw angle in radians.
    pub yaw: Option<T>,
}

impl<T: Real> AngleMeasurement<T> {
    /// Measurement covering all three axes.
    pub fn full(roll: T, pitch: T, yaw: T) -> Self {
        Self {
            roll: Some(roll),
            pitch: Some(pitch),
            yaw: Some(yaw),
        }
    }

    /// Measurement of roll and pitch only.
    pub fn tilt(roll: T, pitch: T) -> Self {
        Self {
            roll: Some(roll),
            pitch: Some(pitch),
            yaw: None,
        }
    }

    fn is_finite(&self) -> bool {
        [self.roll, self.pitch, self.yaw]
            .iter()
            .flatten()
            .all(|angle| Float::is_finite(*angle))
    }
}

/// Fused attitude for all three axes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Attitude<T> {
    /// Roll estimate.
    pub roll: AttitudeVector<T>,
    /// Pitch estimate.
    pub pitch: AttitudeVector<T>,
    /// Yaw estimate.
    pub yaw: AttitudeVector<T>,
}

impl<T: Copy> Attitude<T> {
    /// Euler angles `(roll, pitch, yaw)`.
    pub fn angles(&self) -> (T, T, T) {
        (self.roll.angle, self.pitch.angle, self.yaw.angle)
    }

    /// Bias-corrected body rates `(roll, pitch, yaw)`.
    pub fn rates(&self) -> (T, T, T) {
        (self.roll.angle_rate, self.pitch.angle_rate, self.yaw.angle_rate)
    }
}

/// Attitude estimator, one filter per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudeEstimator<T> {
    /// Noise models the filters were built from.
    pub config: EstimatorConfig<T>,
    /// Roll filter.
    pub roll: KalmanState<T>,
    /// Pitch filter.
    pub pitch: KalmanState<T>,
    /// Yaw filter.
    pub yaw: KalmanState<T>,
}

impl<T: Real> AttitudeEstimator<T> {
    /// Creates an estimator with the calibrated defaults.
    pub fn new() -> Self {
        Self::build(EstimatorConfig::new())
    }

    /// Creates an estimator from a custom configuration after validating it.
    pub fn with_config(config: EstimatorConfig<T>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: EstimatorConfig<T>) -> Self {
        Self {
            config,
            roll: KalmanState::new(config.roll),
            pitch: KalmanState::new(config.pitch),
            yaw: KalmanState::new(config.yaw),
        }
    }

    /// Propagates all three axes by `dt` seconds. Rates are `(p, q, r)` in
    /// rad/s. A non-finite sample is rejected without touching any axis.
    pub fn predict(&mut self, rates: (T, T, T), dt: T) -> Result<()> {
        if !all_finite(rates) {
            log_warn!("estimator: non-finite gyro sample dropped");
            return Err(Error::NonFiniteInput("gyro rate"));
        }
        if !(Float::is_finite(dt) && dt > T::zero()) {
            return Err(Error::ImplausibleMagnitude("dt"));
        }
        self.roll.predict(rates.0, dt)?;
        self.pitch.predict(rates.1, dt)?;
        self.yaw.predict(rates.2, dt)
    }

    /// Corrects the axes present in `measurement`.
    pub fn correct(&mut self, measurement: AngleMeasurement<T>) -> Result<()> {
        if !measurement.is_finite() {
            log_warn!("estimator: non-finite angle measurement dropped");
            return Err(Error::NonFiniteInput("angle measurement"));
        }
        if let Some(roll) = measurement.roll {
            self.roll.correct(roll)?;
        }
        if let Some(pitch) = measurement.pitch {
            self.pitch.correct(pitch)?;
        }
        if let Some(yaw) = measurement.yaw {
            self.yaw.correct(yaw)?;
        }
        Ok(())
    }

    /// Returns every filter to its initial state.
    pub fn reset(&mut self) {
        *self = Self::build(self.config);
    }

    /// Snapshot of all three axes.
    pub fn attitude(&self) -> Attitude<T> {
        Attitude {
            roll: self.roll.attitude(),
            pitch: self.pitch.attitude(),
            yaw: self.yaw.attitude(),
        }
    }

    /// Roll angle in radians.
    pub fn roll_angle(&self) -> T {
        self.roll.angle
    }

    /// Pitch angle in radians.
    pub fn pitch_angle(&self) -> T {
        self.pitch.angle
    }

    /// Yaw angle in radians, within `[-π, π]`.
    pub fn yaw_angle(&self) -> T {
        self.yaw.angle
    }

    /// Compass heading in radians, within `[0, 2π)`.
    pub fn heading(&self) -> T {
        let two_pi = T::PI() + T::PI();
        let heading = if self.yaw.angle < T::zero() {
            self.yaw.angle + two_pi
        } else {
            self.yaw.angle
        };
        if heading >= two_pi {
            heading - two_pi
        } else {
            heading
        }
    }
}

impl<T: Real> Default for AttitudeEstimator<T> {
    fn default() -> Self {
        Self::new()
    }
}
