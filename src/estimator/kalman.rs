// src/estimator/kalman.rs

//! # Single-Axis Kalman Filter
//!
//! The filter integrates the bias-corrected gyro rate and corrects both the
//! angle and the rate bias from absolute angle measurements. The covariance
//! is symmetrized and its diagonal clamped to non-negative after every step.

use crate::config::AxisNoise;
use crate::error::{Error, Result};
use crate::number::{wrap_pi, Number, Real};
use num_traits::Float;

/// Fused estimate for one axis, as consumed by control.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AttitudeVector<T> {
    /// Angle in radians. For yaw, think "heading".
    pub angle: T,
    /// Bias-corrected angular rate from the last prediction, rad/s.
    pub angle_rate: T,
    /// Estimated gyro rate bias, rad/s.
    pub angle_rate_bias: T,
}

/// Kalman filter state for one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KalmanState<T> {
    /// Angle estimate in radians, kept within `[-π, π]`.
    pub angle: T,
    /// Gyro rate bias estimate, rad/s.
    pub bias: T,
    /// Bias-corrected rate used by the last prediction, rad/s.
    pub rate: T,
    /// Error covariance, row 1 column 1.
    pub p11: T,
    /// Error covariance, row 1 column 2.
    pub p12: T,
    /// Error covariance, row 2 column 1.
    pub p21: T,
    /// Error covariance, row 2 column 2.
    pub p22: T,
    /// Angle process noise.
    pub q_angle: T,
    /// Bias process noise.
    pub q_bias: T,
    /// Measurement noise.
    pub r: T,
    /// Angle gain of the last correction. Diagnostic only.
    pub k1: T,
    /// Bias gain of the last correction. Diagnostic only.
    pub k2: T,
}

impl<T: Real> KalmanState<T> {
    /// Creates a filter at zero angle and bias from the given noise model.
    pub fn new(noise: AxisNoise<T>) -> Self {
        Self {
            angle: T::zero(),
            bias: T::zero(),
            rate: T::zero(),
            p11: noise.initial_p11,
            p12: T::zero(),
            p21: T::zero(),
            p22: noise.initial_p22,
            q_angle: noise.q_angle,
            q_bias: noise.q_bias,
            r: noise.r,
            k1: T::zero(),
            k2: T::zero(),
        }
    }

    /// Returns the filter to its initial state, keeping the noise model.
    pub fn reset(&mut self, noise: AxisNoise<T>) {
        *self = Self::new(noise);
    }

    /// Propagates the state by `dt` seconds with the measured gyro `rate`.
    ///
    /// Non-finite inputs and non-positive `dt` are rejected and the state is
    /// left untouched.
    pub fn predict(&mut self, rate: T, dt: T) -> Result<()> {
        if !Float::is_finite(rate) {
            return Err(Error::NonFiniteInput("gyro rate"));
        }
        if !(Float::is_finite(dt) && dt > T::zero()) {
            return Err(Error::ImplausibleMagnitude("dt"));
        }

        self.rate = rate - self.bias;
        self.angle = wrap_pi(self.angle + self.rate * dt);

        self.p11 = self.p11 + dt * (dt * self.p22 - self.p12 - self.p21 + self.q_angle);
        self.p12 = self.p12 - dt * self.p22;
        self.p21 = self.p21 - dt * self.p22;
        self.p22 = self.p22 + self.q_bias * dt;

        self.condition();
        Ok(())
    }

    /// Corrects angle and bias from an absolute angle measurement. Returns
    /// the innovation, wrapped into `[-π, π]`.
    ///
    /// `k1` lies in `[0, 1]` because `p11 ≥ 0` and `r > 0`. `k2` is normally
    /// negative, since a positive bias lowers the predicted angle; its
    /// magnitude is clamped to 1.
    pub fn correct(&mut self, measured_angle: T) -> Result<T> {
        if !Float::is_finite(measured_angle) {
            return Err(Error::NonFiniteInput("angle measurement"));
        }

        let innovation = wrap_pi(measured_angle - self.angle);
        let s = self.p11 + self.r;
        if !(s > T::zero()) {
            return Err(Error::ImplausibleMagnitude("innovation covariance"));
        }
        self.k1 = Number::clamp(self.p11 / s, T::zero(), T::one());
        self.k2 = Number::clamp(self.p21 / s, -T::one(), T::one());

        self.angle = wrap_pi(self.angle + self.k1 * innovation);
        self.bias = self.bias + self.k2 * innovation;

        let (p11, p12) = (self.p11, self.p12);
        self.p11 = p11 - self.k1 * p11;
        self.p12 = p12 - self.k1 * p12;
        self.p21 = self.p21 - self.k2 * p11;
        self.p22 = self.p22 - self.k2 * p12;

        self.condition();
        Ok(innovation)
    }

    /// Angle and bias gains of the last correction.
    pub fn gains(&self) -> (T, T) {
        (self.k1, self.k2)
    }

    /// Snapshot of the fused estimate.
    pub fn attitude(&self) -> AttitudeVector<T> {
        AttitudeVector {
            angle: self.angle,
            angle_rate: self.rate,
            angle_rate_bias: self.bias,
        }
    }

    /// Keeps `P` symmetric with a non-negative diagonal.
    fn condition(&mut self) {
        let off_diagonal = (self.p12 + self.p21) / (T::one() + T::one());
        self.p12 = off_diagonal;
        self.p21 = off_diagonal;
        self.p11 = Float::max(self.p11, T::zero());
        self.p22 = Float::max(self.p22, T::zero());
    }
}

impl<T: Real> Default for KalmanState<T> {
    fn default() -> Self {
        Self::new(AxisNoise::new())
    }
}
