// src/config.rs

//! # Flight Core Configuration
//!
//! Calibration constants for the estimator, the PID bank, the sensor
//! boundary checks and the control period. Every struct has a `new()` that
//! returns the calibrated defaults of the reference airframe; fields are
//! public so a board crate can override them before calling `validate()`.

use crate::error::{Error, Result};
use crate::number::{real, Real};
use crate::pid::{PidForm, YawMode};
use num_traits::Float;

/// Default control period, in microseconds.
pub const DEFAULT_CONTROL_PERIOD_US: u32 = 4_000;

/// Angle process noise, calibrated on the reference airframe.
pub const Q_ANGLE_CAL: f32 = 0.05;
/// Bias process noise, calibrated on the reference airframe.
pub const Q_BIAS_CAL: f32 = 0.005;
/// Measurement noise, from the variance of 480 console samples.
pub const R_CAL: f32 = 0.000185;

/// Vehicle mass in kg.
pub const MASS: f32 = 1.3;
/// Gravitational acceleration in m/s².
pub const G_ACC: f32 = 9.82;
/// Moment of inertia around the body x axis, kg·m².
pub const IXX: f32 = 0.0141;
/// Moment of inertia around the body y axis, kg·m².
pub const IYY: f32 = 0.0141;
/// Moment of inertia around the body z axis, kg·m².
pub const IZZ: f32 = 0.0267;
/// Maximum total thrust in N (four motors at ~12 N each).
pub const MAX_THRUST: f32 = 48.0;
/// Maximum roll and pitch moment in N·m.
pub const MAX_ROLLPITCH_MOM: f32 = 2.4;
/// Maximum yaw moment in N·m.
pub const MAX_YAW_MOM: f32 = 0.6;

/// Noise and initial covariance for one estimator axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisNoise<T> {
    /// Process noise of the angle state.
    pub q_angle: T,
    /// Process noise of the rate bias state.
    pub q_bias: T,
    /// Measurement noise of the absolute angle correction.
    pub r: T,
    /// Initial angle variance.
    pub initial_p11: T,
    /// Initial bias variance.
    pub initial_p22: T,
}

impl<T: Real> AxisNoise<T> {
    /// Creates the calibrated noise model with a zero initial covariance.
    pub fn new() -> Self {
        Self {
            q_angle: real(Q_ANGLE_CAL),
            q_bias: real(Q_BIAS_CAL),
            r: real(R_CAL),
            initial_p11: T::zero(),
            initial_p22: T::zero(),
        }
    }

    fn validate(&self) -> Result<()> {
        let values = [self.q_angle, self.q_bias, self.r, self.initial_p11, self.initial_p22];
        if values.iter().any(|value| !Float::is_finite(*value)) {
            return Err(Error::InvalidConfig("estimator noise"));
        }
        if self.q_angle < T::zero() || self.q_bias < T::zero() {
            return Err(Error::InvalidConfig("process noise"));
        }
        if self.r <= T::zero() {
            return Err(Error::InvalidConfig("measurement noise"));
        }
        if self.initial_p11 < T::zero() || self.initial_p22 < T::zero() {
            return Err(Error::InvalidConfig("initial covariance"));
        }
        Ok(())
    }
}

impl<T: Real> Default for AxisNoise<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Estimator configuration, one noise model per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorConfig<T> {
    /// Roll axis noise.
    pub roll: AxisNoise<T>,
    /// Pitch axis noise.
    pub pitch: AxisNoise<T>,
    /// Yaw axis noise.
    pub yaw: AxisNoise<T>,
}

impl<T: Real> EstimatorConfig<T> {
    /// Creates a configuration with the calibrated noise on every axis.
    pub fn new() -> Self {
        Self {
            roll: AxisNoise::new(),
            pitch: AxisNoise::new(),
            yaw: AxisNoise::new(),
        }
    }

    /// Checks every axis noise model.
    pub fn validate(&self) -> Result<()> {
        self.roll.validate()?;
        self.pitch.validate()?;
        self.yaw.validate()
    }
}

impl<T: Real> Default for EstimatorConfig<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Boundary checks applied to raw sensor samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorConfig<T> {
    /// Largest plausible angular rate on any axis, rad/s.
    pub max_rate: T,
    /// Local gravitational acceleration, m/s².
    pub gravity: T,
    /// Accepted relative deviation of the accelerometer norm from `gravity`.
    pub accel_tolerance: T,
    /// Earth magnetic field in the inertial (north, east, down) frame.
    /// Only the direction matters. Defaults to southern Sweden.
    pub inertial_magnetic_field: (T, T, T),
}

impl<T: Real> SensorConfig<T> {
    /// Creates the default boundary checks.
    pub fn new() -> Self {
        Self {
            // 2000 deg/s full scale
            max_rate: real(34.9),
            gravity: real(G_ACC),
            accel_tolerance: real(0.25),
            inertial_magnetic_field: (real(17.1), real(0.9), real(47.4)),
        }
    }

    /// Checks that the limits are usable.
    pub fn validate(&self) -> Result<()> {
        if !(self.max_rate > T::zero()) {
            return Err(Error::InvalidConfig("max_rate"));
        }
        if !(self.gravity > T::zero()) {
            return Err(Error::InvalidConfig("gravity"));
        }
        if !(self.accel_tolerance > T::zero() && self.accel_tolerance < T::one()) {
            return Err(Error::InvalidConfig("accel_tolerance"));
        }
        let (x, y, z) = self.inertial_magnetic_field;
        if !(x * x + y * y + z * z > T::zero()) {
            return Err(Error::InvalidConfig("inertial_magnetic_field"));
        }
        Ok(())
    }
}

impl<T: Real> Default for SensorConfig<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Tuning and output shaping for one PID controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidConfig<T> {
    /// Gain.
    pub k: T,
    /// Integration time (classic form) or integral gain (parallel form).
    pub ti: T,
    /// Derivative time (classic form) or derivative gain (parallel form).
    pub td: T,
    /// Anti-windup tracking time. `None` derives `sqrt(ti * td)`.
    pub tt: Option<T>,
    /// Set-point weight of the proportional term, 0..=1.
    pub beta: T,
    /// Set-point weight of the derivative term, 0..=1.
    pub gamma: T,
    /// Derivative filter constant.
    pub n: T,
    /// Lower saturation limit of the control signal.
    pub lower: T,
    /// Upper saturation limit of the control signal.
    pub upper: T,
    /// Scale applied to the summed terms, e.g. an inertia or mass.
    pub scale: T,
    /// Offset added to the summed terms before scaling.
    pub offset: T,
    /// Enables integral action and back-calculation anti-windup.
    pub integral_enabled: bool,
}

impl<T: Real> PidConfig<T> {
    /// Creates a unity proportional controller with wide symmetric limits.
    /// These should be replaced with values tuned for the hardware.
    pub fn new() -> Self {
        Self {
            k: T::one(),
            ti: T::zero(),
            td: T::zero(),
            tt: None,
            beta: T::one(),
            gamma: T::one(),
            n: real(10.0),
            lower: -<T as Float>::max_value(),
            upper: <T as Float>::max_value(),
            scale: T::one(),
            offset: T::zero(),
            integral_enabled: false,
        }
    }

    /// Roll and pitch attitude controller of the reference airframe.
    pub fn roll_pitch(inertia: T) -> Self {
        Self {
            k: real(40.0),
            ti: real(2.0),
            td: real(0.1),
            tt: None,
            beta: T::one(),
            gamma: T::one(),
            n: real(15.0),
            lower: -real::<T>(MAX_ROLLPITCH_MOM),
            upper: real(MAX_ROLLPITCH_MOM),
            scale: inertia,
            offset: T::zero(),
            integral_enabled: false,
        }
    }

    /// Yaw controller of the reference airframe.
    pub fn yaw() -> Self {
        Self {
            k: real(4.0),
            ti: real(1.5),
            td: T::zero(),
            tt: None,
            beta: T::one(),
            gamma: T::zero(),
            n: real(15.0),
            lower: -real::<T>(MAX_YAW_MOM),
            upper: real(MAX_YAW_MOM),
            scale: real(IZZ),
            offset: T::zero(),
            integral_enabled: false,
        }
    }

    /// Vertical velocity controller. Z points to earth, so thrust is negative
    /// and the output is offset by gravity and scaled by mass.
    pub fn altitude() -> Self {
        Self {
            k: real(2.0),
            ti: real(3.0),
            td: real(0.05),
            tt: None,
            beta: T::one(),
            gamma: T::one(),
            n: real(15.0),
            lower: -real::<T>(MAX_THRUST),
            upper: T::zero(),
            scale: real(MASS),
            offset: -real::<T>(G_ACC),
            integral_enabled: false,
        }
    }

    /// Anti-windup tracking time, explicit or `sqrt(ti * td)`.
    pub fn tracking_time(&self) -> T {
        match self.tt {
            Some(tt) => tt,
            None => {
                let product = self.ti * self.td;
                if product > T::zero() {
                    Float::sqrt(product)
                } else {
                    T::zero()
                }
            }
        }
    }

    /// Checks saturation ordering and the integral configuration.
    pub fn validate(&self, form: PidForm) -> Result<()> {
        let values = [
            self.k, self.ti, self.td, self.beta, self.gamma, self.n, self.scale, self.offset,
        ];
        if values.iter().any(|value| !Float::is_finite(*value)) {
            return Err(Error::InvalidConfig("pid gains"));
        }
        if Float::is_nan(self.lower) || Float::is_nan(self.upper) || self.lower > self.upper {
            return Err(Error::InvalidConfig("saturation limits"));
        }
        if self.td < T::zero() || self.n < T::zero() {
            return Err(Error::InvalidConfig("derivative filter"));
        }
        if self.integral_enabled {
            if form == PidForm::Classic && !(self.ti > T::zero()) {
                return Err(Error::InvalidConfig("integration time"));
            }
            let tt = self.tracking_time();
            if !(Float::is_finite(tt) && tt > T::zero()) {
                return Err(Error::InvalidConfig("tracking time"));
            }
        }
        Ok(())
    }
}

impl<T: Real> Default for PidConfig<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration of the four controllers in the bank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidBankConfig<T> {
    /// Roll angle controller.
    pub roll: PidConfig<T>,
    /// Pitch angle controller.
    pub pitch: PidConfig<T>,
    /// Yaw controller.
    pub yaw: PidConfig<T>,
    /// Vertical velocity controller.
    pub altitude: PidConfig<T>,
    /// Algebraic form shared by all controllers.
    pub form: PidForm,
    /// Whether yaw is controlled on angle or on rate.
    pub yaw_mode: YawMode,
    /// Enables the altitude controller. When disabled, thrust passes through.
    pub altitude_enabled: bool,
}

impl<T: Real> PidBankConfig<T> {
    /// Creates the reference airframe bank, altitude inactive.
    pub fn new() -> Self {
        Self {
            roll: PidConfig::roll_pitch(real(IXX)),
            pitch: PidConfig::roll_pitch(real(IYY)),
            yaw: PidConfig::yaw(),
            altitude: PidConfig::altitude(),
            form: PidForm::Classic,
            yaw_mode: YawMode::Rate,
            altitude_enabled: false,
        }
    }

    /// Checks every controller against the selected form.
    pub fn validate(&self) -> Result<()> {
        self.roll.validate(self.form)?;
        self.pitch.validate(self.form)?;
        self.yaw.validate(self.form)?;
        self.altitude.validate(self.form)
    }
}

impl<T: Real> Default for PidBankConfig<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Top-level configuration of the flight-control core.
///
/// Example Usage
/// ```
/// use free_flight_core::config::FlightCoreConfig;
///
/// let mut config = FlightCoreConfig::<f32>::new();
///
/// // Run the control loop at 500 Hz instead of 250 Hz.
/// config.control_period_us = 2_000;
///
/// // Enable integral action on roll with an explicit tracking time.
/// config.pid.roll.integral_enabled = true;
/// config.pid.roll.tt = Some(0.3);
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.control_period(), 0.002);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightCoreConfig<T> {
    /// Control period in microseconds.
    pub control_period_us: u32,
    /// Estimator noise models.
    pub estimator: EstimatorConfig<T>,
    /// PID bank tuning.
    pub pid: PidBankConfig<T>,
    /// Sensor boundary checks.
    pub sensor: SensorConfig<T>,
}

impl<T: Real> FlightCoreConfig<T> {
    /// Creates the calibrated reference configuration.
    pub fn new() -> Self {
        Self {
            control_period_us: DEFAULT_CONTROL_PERIOD_US,
            estimator: EstimatorConfig::new(),
            pid: PidBankConfig::new(),
            sensor: SensorConfig::new(),
        }
    }

    /// Control period in seconds.
    pub fn control_period(&self) -> T {
        real::<T>(self.control_period_us as f32) / real(1_000_000.0)
    }

    /// Checks every invariant before any state is built from the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.control_period_us == 0 {
            return Err(Error::InvalidConfig("control_period_us"));
        }
        self.estimator.validate()?;
        self.pid.validate()?;
        self.sensor.validate()
    }
}

impl<T: Real> Default for FlightCoreConfig<T> {
    fn default() -> Self {
        Self::new()
    }
}
