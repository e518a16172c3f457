// src/scheduler/control_loop.rs

//! # Control Step
//!
//! Owns the canonical estimator, rotation and PID state. Each executed tick
//! runs predict, the pending correction if any, the DCM rebuild and the PID
//! bank, in that order.

use crate::config::FlightCoreConfig;
use crate::error::Result;
use crate::estimator::{AngleMeasurement, AttitudeEstimator};
use crate::logging::{log_info, log_warn};
use crate::number::{real, Real};
use crate::pid::{ActuationCommand, ControlReferences, PidBank};
use crate::rotation::RotationTransformation;
use crate::scheduler::tick::Tick;

/// Estimator, rotation and controllers advanced once per tick.
pub struct ControlLoop<T: Real> {
    estimator: AttitudeEstimator<T>,
    rotation: RotationTransformation<T>,
    pid: PidBank<T>,
    period: T,
    last_command: ActuationCommand<T>,
}

impl<T: Real> ControlLoop<T> {
    /// Builds the control state from a validated configuration.
    pub fn with_config(config: FlightCoreConfig<T>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            estimator: AttitudeEstimator::with_config(config.estimator)?,
            rotation: RotationTransformation::new(),
            pid: PidBank::with_config(config.pid)?,
            period: config.control_period(),
            last_command: ActuationCommand::default(),
        })
    }

    /// Runs one control step.
    ///
    /// The estimator integrates over the whole span the tick stands for,
    /// including skipped periods. A rejected gyro sample or correction leaves
    /// the estimate as it was and control continues on it. An error is
    /// returned only when the controllers could not run; the previous
    /// command remains available through `last_command`.
    pub fn step(
        &mut self,
        tick: &Tick,
        rates: (T, T, T),
        correction: Option<AngleMeasurement<T>>,
        references: &ControlReferences<T>,
    ) -> Result<ActuationCommand<T>> {
        let dt = self.period * real::<T>(tick.periods() as f32);

        if let Err(error) = self.estimator.predict(rates, dt) {
            log_warn!("tick {}: predict skipped: {:?}", tick.index, error);
        }
        if let Some(measurement) = correction {
            if let Err(error) = self.estimator.correct(measurement) {
                log_warn!("tick {}: correction skipped: {:?}", tick.index, error);
            }
        }

        let attitude = self.estimator.attitude();
        let (roll, pitch, yaw) = attitude.angles();
        self.rotation.update(roll, pitch, yaw);

        let command = self.pid.update(&attitude, references, dt)?;
        self.last_command = command;
        Ok(command)
    }

    /// Prepares for a new flight: controllers start from zero, the attitude
    /// estimate carries over.
    pub fn rearm(&mut self) {
        log_info!("control loop re-armed");
        self.pid.reset();
        self.last_command = ActuationCommand::default();
    }

    /// Discards the attitude estimate, e.g. after a failsafe.
    pub fn reset_estimator(&mut self) {
        log_info!("attitude estimate reset");
        self.estimator.reset();
        self.rotation = RotationTransformation::new();
    }

    /// Attitude estimator.
    pub fn estimator(&self) -> &AttitudeEstimator<T> {
        &self.estimator
    }

    /// Orientation matrix of the current estimate.
    pub fn rotation(&self) -> &RotationTransformation<T> {
        &self.rotation
    }

    /// PID bank.
    pub fn pid(&self) -> &PidBank<T> {
        &self.pid
    }

    /// Last command produced by `step`.
    pub fn last_command(&self) -> ActuationCommand<T> {
        self.last_command
    }

    /// Control period, s.
    pub fn period(&self) -> T {
        self.period
    }
}
