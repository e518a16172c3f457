// src/pid/bank.rs

//! # PID Controller Bank
//!
//! Roll, pitch, yaw and altitude controllers updated together once per
//! control period. The altitude controller is inactive by default, in which
//! case the externally supplied thrust passes through unchanged.

use crate::config::PidBankConfig;
use crate::diagnostics::PidDiagnostics;
use crate::error::{Error, Result};
use crate::estimator::Attitude;
use crate::logging::{log_info, log_warn};
use crate::number::{wrap_pi, Real};
use crate::pid::axis::PidAxis;
use crate::pid::compute::PidForm;
use num_traits::Float;

/// Quantity the yaw controller acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum YawMode {
    /// Yaw angle, with the error wrapped across ±π.
    Angle,
    /// Bias-corrected yaw rate.
    #[default]
    Rate,
}

/// Externally supplied references for one control step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlReferences<T> {
    /// Roll angle reference, rad.
    pub roll: T,
    /// Pitch angle reference, rad.
    pub pitch: T,
    /// Yaw reference: angle in rad or rate in rad/s, per `YawMode`.
    pub yaw: T,
    /// Thrust passed through while the altitude controller is disabled, N.
    pub thrust: T,
    /// Measured vertical velocity, m/s, Z pointing to earth.
    pub vertical_velocity: T,
    /// Vertical velocity reference, m/s.
    pub vertical_velocity_reference: T,
}

impl<T: Real> ControlReferences<T> {
    fn is_finite(&self) -> bool {
        [
            self.roll,
            self.pitch,
            self.yaw,
            self.thrust,
            self.vertical_velocity,
            self.vertical_velocity_reference,
        ]
        .iter()
        .all(|value| Float::is_finite(*value))
    }
}

/// Actuation output of one control step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActuationCommand<T> {
    /// Roll moment, N·m.
    pub roll_moment: T,
    /// Pitch moment, N·m.
    pub pitch_moment: T,
    /// Yaw moment, N·m.
    pub yaw_moment: T,
    /// Total thrust, N.
    pub thrust: T,
}

/// The four flight controllers.
pub struct PidBank<T: Real> {
    roll: PidAxis<T>,
    pitch: PidAxis<T>,
    yaw: PidAxis<T>,
    altitude: PidAxis<T>,
    form: PidForm,
    yaw_mode: YawMode,
    altitude_enabled: bool,
}

impl<T: Real> PidBank<T> {
    /// Creates the reference airframe bank.
    pub fn new() -> Self {
        Self::build(PidBankConfig::new())
    }

    /// Creates a bank from a custom configuration after validating it.
    pub fn with_config(config: PidBankConfig<T>) -> Result<Self> {
        config.validate()?;
        log_info!("pid bank configured");
        Ok(Self::build(config))
    }

    fn build(config: PidBankConfig<T>) -> Self {
        PidBank {
            roll: PidAxis::with_config(config.roll, config.form),
            pitch: PidAxis::with_config(config.pitch, config.form),
            yaw: PidAxis::with_config(config.yaw, config.form),
            altitude: PidAxis::with_config(config.altitude, config.form),
            form: config.form,
            yaw_mode: config.yaw_mode,
            altitude_enabled: config.altitude_enabled,
        }
    }

    /// Runs every active controller for one step of `dt` seconds.
    ///
    /// Inputs are checked before any controller is touched, so a rejected
    /// step leaves the whole bank unchanged.
    pub fn update(
        &mut self,
        attitude: &Attitude<T>,
        references: &ControlReferences<T>,
        dt: T,
    ) -> Result<ActuationCommand<T>> {
        let (roll, pitch, yaw) = attitude.angles();
        let yaw_rate = attitude.yaw.angle_rate;
        if !(references.is_finite()
            && [roll, pitch, yaw, yaw_rate]
                .iter()
                .all(|value| Float::is_finite(*value)))
        {
            log_warn!("pid bank: non-finite input, step skipped");
            return Err(Error::NonFiniteInput("pid input"));
        }
        if !(Float::is_finite(dt) && dt > T::zero()) {
            return Err(Error::ImplausibleMagnitude("dt"));
        }

        let roll_moment = self.roll.update(roll, references.roll, dt)?;
        let pitch_moment = self.pitch.update(pitch, references.pitch, dt)?;
        let yaw_state = match self.yaw_mode {
            // Present the angle on the reference's branch so the error
            // never jumps at ±π.
            YawMode::Angle => references.yaw - wrap_pi(references.yaw - yaw),
            YawMode::Rate => yaw_rate,
        };
        let yaw_moment = self.yaw.update(yaw_state, references.yaw, dt)?;
        let thrust = if self.altitude_enabled {
            self.altitude.update(
                references.vertical_velocity,
                references.vertical_velocity_reference,
                dt,
            )?
        } else {
            references.thrust
        };

        Ok(ActuationCommand {
            roll_moment,
            pitch_moment,
            yaw_moment,
            thrust,
        })
    }

    /// Clears the running terms and history of every controller, as on
    /// re-arm.
    pub fn reset(&mut self) {
        self.roll.reset();
        self.pitch.reset();
        self.yaw.reset();
        self.altitude.reset();
    }

    /// Running terms of every controller.
    pub fn diagnostics(&self) -> PidDiagnostics<T> {
        PidDiagnostics {
            roll: self.roll.terms(),
            pitch: self.pitch.terms(),
            yaw: self.yaw.terms(),
            altitude: self.altitude.terms(),
        }
    }

    /// Algebraic form shared by the controllers.
    pub fn form(&self) -> PidForm {
        self.form
    }

    /// Quantity the yaw controller acts on.
    pub fn yaw_mode(&self) -> YawMode {
        self.yaw_mode
    }

    /// Whether the altitude controller produces the thrust.
    pub fn altitude_enabled(&self) -> bool {
        self.altitude_enabled
    }
}

impl<T: Real> Default for PidBank<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PidConfig, MAX_ROLLPITCH_MOM};
    use crate::estimator::AttitudeVector;
    use crate::test_utils::*;
    use core::f32::consts::PI;

    fn attitude(roll: f32, pitch: f32, yaw: f32, yaw_rate: f32) -> Attitude<f32> {
        Attitude {
            roll: AttitudeVector {
                angle: roll,
                ..Default::default()
            },
            pitch: AttitudeVector {
                angle: pitch,
                ..Default::default()
            },
            yaw: AttitudeVector {
                angle: yaw,
                angle_rate: yaw_rate,
                angle_rate_bias: 0.0,
            },
        }
    }

    #[test]
    fn test_bank_level_hover_is_quiet() {
        let mut bank = PidBank::<f32>::new();
        let references = ControlReferences {
            thrust: 12.75,
            ..Default::default()
        };
        let command = bank
            .update(&attitude(0.0, 0.0, 0.0, 0.0), &references, 0.004)
            .unwrap();
        assert_eq!(
            ActuationCommand {
                roll_moment: 0.0,
                pitch_moment: 0.0,
                yaw_moment: 0.0,
                thrust: 12.75,
            },
            command
        );
    }

    /// A roll error produces a roll moment of the opposite sign of the
    /// error, bounded by the roll limits.
    #[test]
    fn test_bank_roll_error_saturates() {
        let mut bank = PidBank::<f32>::new();
        let command = bank
            .update(&attitude(-3.0, 0.0, 0.0, 0.0), &ControlReferences::default(), 0.004)
            .unwrap();
        assert_eq!(MAX_ROLLPITCH_MOM, command.roll_moment);
        assert_eq!(0.0, command.pitch_moment);
    }

    #[test]
    fn test_bank_yaw_rate_mode() {
        let mut bank = PidBank::<f32>::new();
        assert_eq!(YawMode::Rate, bank.yaw_mode());
        let command = bank
            .update(&attitude(0.0, 0.0, 1.0, 0.0), &ControlReferences::default(), 0.004)
            .unwrap();
        // The yaw angle is ignored in rate mode.
        assert_eq!(0.0, command.yaw_moment);
    }

    /// In angle mode an error across ±π takes the short way round.
    #[test]
    fn test_bank_yaw_angle_mode_wraps() {
        let config = PidBankConfig {
            yaw_mode: YawMode::Angle,
            yaw: PidConfig {
                k: 1.0,
                lower: -10.0,
                upper: 10.0,
                ..PidConfig::new()
            },
            ..PidBankConfig::new()
        };
        let mut bank = PidBank::with_config(config).unwrap();
        let references = ControlReferences {
            yaw: PI - 0.1,
            ..Default::default()
        };
        let _ = bank
            .update(&attitude(0.0, 0.0, -PI + 0.1, 0.0), &references, 0.004)
            .unwrap();
        let p = bank.diagnostics().yaw.p;
        assert!((p - -0.2).abs() < 1e-4, "Short-way yaw error expected, got {}", p);
    }

    #[test]
    fn test_bank_altitude_enabled() {
        let config = PidBankConfig {
            altitude_enabled: true,
            ..PidBankConfig::new()
        };
        let mut bank = PidBank::with_config(config).unwrap();
        let references = ControlReferences {
            thrust: 5.0,
            ..Default::default()
        };
        let command = bank
            .update(&attitude(0.0, 0.0, 0.0, 0.0), &references, 0.004)
            .unwrap();
        // Hover thrust, negative because Z points to earth.
        assert!(value_close(-9.82 * 1.3, command.thrust));
    }

    #[test]
    fn test_bank_rejects_invalid_config() {
        let config = PidBankConfig {
            roll: PidConfig {
                lower: 1.0,
                upper: -1.0,
                ..PidConfig::new()
            },
            ..PidBankConfig::<f32>::new()
        };
        assert!(matches!(
            PidBank::with_config(config),
            Err(Error::InvalidConfig("saturation limits"))
        ));
    }

    #[test]
    fn test_bank_rejects_non_finite_references() {
        let mut bank = PidBank::<f32>::new();
        let references = ControlReferences {
            pitch: f32::NAN,
            ..Default::default()
        };
        assert!(bank
            .update(&attitude(0.1, 0.0, 0.0, 0.0), &references, 0.004)
            .is_err());
        assert_eq!(PidDiagnostics::default(), bank.diagnostics());
    }

    #[test]
    fn test_bank_reset_clears_terms() {
        let mut bank = PidBank::<f32>::new();
        let _ = bank
            .update(&attitude(0.3, -0.2, 0.0, 0.4), &ControlReferences::default(), 0.004)
            .unwrap();
        assert_ne!(PidDiagnostics::default(), bank.diagnostics());
        bank.reset();
        assert_eq!(PidDiagnostics::default(), bank.diagnostics());
    }
}
