// src/sensor/consumer.rs

//! # Sensor Event Consumer
//!
//! The task side of the sensor pipeline. It owns the drivers and the
//! correction source, waits on the event channel and leaves validated
//! results in a `SensorMailbox` shared with the control task.

use crate::config::SensorConfig;
use crate::error::{Error, Result};
use crate::estimator::AngleMeasurement;
use crate::logging::{log_debug, log_error, log_info, log_warn};
use crate::number::{all_finite, norm, Real};
use crate::sensor::correction::{AccelMagSample, CorrectionSource};
use crate::sensor::event::{SensorEvent, SensorEventChannel};
use crate::shared::SharedState;
use num_traits::Float;

/// Gyro driver.
pub trait GyroSensor<T> {
    /// Reads body rates `(p, q, r)` in rad/s.
    fn read_rates(&mut self) -> Result<(T, T, T)>;
    /// Runs the driver's calibration routine.
    fn calibrate(&mut self) -> Result<()>;
}

/// Combined accelerometer/magnetometer driver.
pub trait AccelMagSensor<T> {
    /// Reads specific force in m/s².
    fn read_acceleration(&mut self) -> Result<(T, T, T)>;
    /// Reads the magnetic field.
    fn read_magnetic_field(&mut self) -> Result<(T, T, T)>;
    /// Runs the driver's calibration routine.
    fn calibrate(&mut self) -> Result<()>;
}

/// Latest validated sensor results, shared between the consumer task and
/// the control task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorMailbox<T> {
    /// Latest validated body rates, rad/s.
    pub gyro_rates: (T, T, T),
    /// Number of gyro samples accepted.
    pub gyro_samples: u32,
    /// Correction not yet consumed by the control task. A newer one
    /// replaces it.
    pub pending_correction: Option<AngleMeasurement<T>>,
    /// Number of corrections produced.
    pub corrections: u32,
    /// Number of samples rejected by validation.
    pub rejected_samples: u32,
    /// Number of failed driver reads.
    pub read_failures: u32,
}

impl<T: Copy> SensorMailbox<T> {
    /// Creates an empty mailbox holding `rates` until the first gyro sample.
    pub const fn new(rates: (T, T, T)) -> Self {
        Self {
            gyro_rates: rates,
            gyro_samples: 0,
            pending_correction: None,
            corrections: 0,
            rejected_samples: 0,
            read_failures: 0,
        }
    }

    /// Takes the pending correction, leaving none.
    pub fn take_correction(&mut self) -> Option<AngleMeasurement<T>> {
        self.pending_correction.take()
    }
}

impl<T: Real> Default for SensorMailbox<T> {
    fn default() -> Self {
        Self::new((T::zero(), T::zero(), T::zero()))
    }
}

/// Dispatches sensor events to the drivers and validates their samples.
pub struct SensorEventConsumer<T, G, A, C> {
    gyro: G,
    accel_mag: A,
    correction: C,
    config: SensorConfig<T>,
}

impl<T, G, A, C> SensorEventConsumer<T, G, A, C>
where
    T: Real,
    G: GyroSensor<T>,
    A: AccelMagSensor<T>,
    C: CorrectionSource<T>,
{
    /// Creates a consumer after validating the sensor limits.
    pub fn new(gyro: G, accel_mag: A, correction: C, config: SensorConfig<T>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            gyro,
            accel_mag,
            correction,
            config,
        })
    }

    /// Handles one event. Failures are counted in the mailbox and returned;
    /// they never leave a partial result behind.
    pub fn handle<S>(&mut self, event: SensorEvent, mailbox: &S) -> Result<()>
    where
        S: SharedState<SensorMailbox<T>>,
    {
        match event {
            SensorEvent::GyroDataReady => {
                let rates = self.read_gyro(mailbox)?;
                mailbox.with_mut(|mailbox| {
                    mailbox.gyro_rates = rates;
                    mailbox.gyro_samples = mailbox.gyro_samples.wrapping_add(1);
                });
            }
            SensorEvent::AccelMagDataReady => {
                let measurement = self.read_correction(mailbox)?;
                mailbox.with_mut(|mailbox| {
                    mailbox.pending_correction = Some(measurement);
                    mailbox.corrections = mailbox.corrections.wrapping_add(1);
                });
            }
            SensorEvent::GyroCalibrate => {
                log_info!("calibrating gyro");
                self.gyro.calibrate().map_err(|_| Error::SensorCalibration)?;
            }
            SensorEvent::AccelMagCalibrate => {
                log_info!("calibrating accelerometer/magnetometer");
                self.accel_mag
                    .calibrate()
                    .map_err(|_| Error::SensorCalibration)?;
            }
        }
        Ok(())
    }

    /// Drains `channel` for the lifetime of the flight session.
    pub async fn run<S>(&mut self, channel: &SensorEventChannel, mailbox: &S) -> !
    where
        S: SharedState<SensorMailbox<T>>,
    {
        loop {
            let event = channel.receive().await;
            if let Err(error) = self.handle(event, mailbox) {
                log_debug!("sensor event {:?} not applied: {:?}", event, error);
            }
        }
    }

    fn read_gyro<S>(&mut self, mailbox: &S) -> Result<(T, T, T)>
    where
        S: SharedState<SensorMailbox<T>>,
    {
        let rates = self.gyro.read_rates().map_err(|_| {
            log_error!("gyro read failed");
            mailbox.with_mut(|mailbox| mailbox.read_failures = mailbox.read_failures.wrapping_add(1));
            Error::SensorRead
        })?;
        let limit = self.config.max_rate;
        let checked = if !all_finite(rates) {
            Err(Error::NonFiniteInput("gyro rate"))
        } else if [rates.0, rates.1, rates.2]
            .iter()
            .any(|rate| Float::abs(*rate) > limit)
        {
            Err(Error::ImplausibleMagnitude("gyro rate"))
        } else {
            Ok(rates)
        };
        checked.map_err(|error| Self::reject(mailbox, error))
    }

    fn read_correction<S>(&mut self, mailbox: &S) -> Result<AngleMeasurement<T>>
    where
        S: SharedState<SensorMailbox<T>>,
    {
        let read = self
            .accel_mag
            .read_acceleration()
            .and_then(|acceleration| {
                self.accel_mag
                    .read_magnetic_field()
                    .map(|magnetic_field| AccelMagSample {
                        acceleration,
                        magnetic_field,
                    })
            });
        let sample = read.map_err(|_| {
            log_error!("accelerometer/magnetometer read failed");
            mailbox.with_mut(|mailbox| mailbox.read_failures = mailbox.read_failures.wrapping_add(1));
            Error::SensorRead
        })?;

        let gravity = self.config.gravity;
        let tolerance = self.config.accel_tolerance * gravity;
        let checked = if !(all_finite(sample.acceleration) && all_finite(sample.magnetic_field)) {
            Err(Error::NonFiniteInput("accel/mag sample"))
        } else if Float::abs(norm(sample.acceleration) - gravity) > tolerance {
            // Maneuvering: the accelerometer no longer points along gravity.
            Err(Error::ImplausibleMagnitude("acceleration"))
        } else {
            self.correction.measure(&sample)
        };
        checked.map_err(|error| Self::reject(mailbox, error))
    }

    fn reject<S>(mailbox: &S, error: Error) -> Error
    where
        S: SharedState<SensorMailbox<T>>,
    {
        log_warn!("sensor sample rejected: {:?}", error);
        mailbox.with_mut(|mailbox| {
            mailbox.rejected_samples = mailbox.rejected_samples.wrapping_add(1)
        });
        error
    }
}
